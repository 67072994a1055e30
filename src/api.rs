//! # HTTP surface
//! Router, shared state, and handlers. The State Store and the Event Log sit
//! behind one mutex together: an update's "apply, then log" sequence must be
//! atomic so the log's newest entry per feed always reflects the latest store
//! mutation for that feed.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::events::{EventKind, EventLog, FeedSummary, RequestMeta, UpdateEvent, DEFAULT_QUERY_LIMIT};
use crate::feed::Feed;
use crate::overlay;
use crate::state::{FeedValue, Snapshot, StateStore};

/// Wire-level build label, distinct from the deploy-specific `buildId`.
pub const BUILD: &str = "overlay-v1";

/// Store and log under a single lock; see module docs.
struct Core {
    store: StateStore,
    log: EventLog,
}

#[derive(Clone)]
pub struct AppState {
    core: Arc<Mutex<Core>>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let core = Core {
            store: StateStore::new(Utc::now()),
            log: EventLog::new(config.max_events),
        };
        Self {
            core: Arc::new(Mutex::new(core)),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/routes", get(get_routes))
        .route("/status", get(get_status).post(post_status))
        .route("/updates", get(get_updates))
        .route("/updates/summary", get(get_summary))
        .route("/overlay/{feed}", get(get_overlay))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

const NO_STORE: [(header::HeaderName, &str); 1] = [(header::CACHE_CONTROL, "no-store")];

async fn liveness(State(state): State<AppState>) -> impl IntoResponse {
    (
        NO_STORE,
        format!("OK OVERLAY BUILD v1 ({})", state.config.build_id),
    )
}

async fn get_routes() -> impl IntoResponse {
    (
        NO_STORE,
        Json(json!({
            "ok": true,
            "routes": [
                "/status (GET, POST)",
                "/updates?limit=50&feed=PRST",
                "/updates/summary",
                "/overlay/asn",
                "/overlay/pup",
                "/overlay/backup",
                "/overlay/prst",
            ],
        })),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    build: &'static str,
    build_id: String,
    updated: DateTime<Utc>,
    values: BTreeMap<Feed, FeedValue>,
}

async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = {
        let core = state.core.lock().expect("state mutex poisoned");
        core.store.snapshot()
    };
    (
        NO_STORE,
        Json(StatusResponse {
            build: BUILD,
            build_id: state.config.build_id.clone(),
            updated: snapshot.updated,
            values: snapshot.values,
        }),
    )
}

/// Update request body: bulk when a `values` object is present, single
/// otherwise. Decided up front rather than by probing fields mid-flight.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UpdateBody {
    Bulk {
        values: serde_json::Map<String, Value>,
    },
    Single {
        #[serde(default)]
        feed: Option<String>,
        #[serde(default)]
        ou: Option<Value>,
    },
}

/// Single-update pairs as they arrive outside JSON: the query string (some
/// data pushers can only set a URL) and form-urlencoded bodies share this
/// shape.
#[derive(Debug, Deserialize)]
struct SingleParams {
    feed: Option<String>,
    ou: Option<String>,
}

#[derive(Serialize)]
struct ApplyResponse {
    ok: bool,
    applied: Vec<String>,
    ignored: Vec<IgnoredEntry>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IgnoredEntry {
    feed: String,
    raw_feed: Option<String>,
}

async fn post_status(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<SingleParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let parsed: Option<UpdateBody> = if body.is_empty() {
        None
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        // Some pushers can only send form bodies; they carry single updates.
        match serde_urlencoded::from_bytes::<SingleParams>(&body) {
            Ok(form) => Some(UpdateBody::Single {
                feed: form.feed,
                ou: form.ou.map(Value::String),
            }),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    NO_STORE,
                    Json(json!({ "ok": false, "error": "invalid form body" })),
                )
                    .into_response();
            }
        }
    } else {
        match serde_json::from_slice(&body) {
            Ok(b) => Some(b),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    NO_STORE,
                    Json(json!({ "ok": false, "error": "invalid JSON body" })),
                )
                    .into_response();
            }
        }
    };

    let now = Utc::now();
    let meta = request_meta(addr, &headers);

    let mut applied = Vec::new();
    let mut ignored = Vec::new();

    let mut core = state.core.lock().expect("state mutex poisoned");
    let core = &mut *core;

    match parsed {
        Some(UpdateBody::Bulk { values }) => {
            for (raw_feed, raw_value) in &values {
                let outcome = core.store.apply_update(raw_feed, Some(raw_value), now);
                core.log.record(UpdateEvent {
                    ts: now,
                    kind: EventKind::Bulk,
                    ip: meta.ip.clone(),
                    xff: meta.xff.clone(),
                    ua: meta.ua.clone(),
                    feed: outcome.feed.clone(),
                    raw_feed: Some(raw_feed.clone()),
                    ou: outcome.ou,
                    applied: outcome.accepted,
                });
                if outcome.accepted {
                    applied.push(outcome.feed);
                } else {
                    ignored.push(IgnoredEntry {
                        feed: outcome.feed,
                        raw_feed: Some(raw_feed.clone()),
                    });
                }
            }
            // The global timestamp advances for any bulk payload, even one
            // where every pair was rejected. Long-observed behavior; kept.
            core.store.touch(now);
        }
        single => {
            let (body_feed, body_ou) = match single {
                Some(UpdateBody::Single { feed, ou }) => (feed, ou),
                _ => (None, None),
            };
            let raw_feed = body_feed.or(query.feed);
            let raw_ou = body_ou.or_else(|| query.ou.map(Value::String));

            let outcome =
                core.store
                    .apply_update(raw_feed.as_deref().unwrap_or(""), raw_ou.as_ref(), now);
            core.log.record(UpdateEvent {
                ts: now,
                kind: EventKind::Single,
                ip: meta.ip.clone(),
                xff: meta.xff.clone(),
                ua: meta.ua.clone(),
                feed: outcome.feed.clone(),
                raw_feed: raw_feed.clone(),
                ou: outcome.ou,
                applied: outcome.accepted,
            });
            if outcome.accepted {
                applied.push(outcome.feed);
            } else {
                ignored.push(IgnoredEntry {
                    feed: outcome.feed,
                    raw_feed,
                });
            }
        }
    }

    tracing::debug!(
        applied = applied.len(),
        ignored = ignored.len(),
        ip = %meta.ip,
        "status update"
    );

    (
        NO_STORE,
        Json(ApplyResponse {
            ok: true,
            applied,
            ignored,
        }),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct UpdatesParams {
    limit: Option<String>,
    feed: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdatesResponse {
    build: &'static str,
    build_id: String,
    server_time: DateTime<Utc>,
    max_events: usize,
    latest: Snapshot,
    events: Vec<UpdateEvent>,
}

async fn get_updates(
    State(state): State<AppState>,
    Query(params): Query<UpdatesParams>,
) -> impl IntoResponse {
    // Lenient limit parsing: anything unusable falls back to the default.
    let limit = params
        .limit
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_QUERY_LIMIT as i64);
    let feed_filter = params
        .feed
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Feed::normalize);

    let core = state.core.lock().expect("state mutex poisoned");
    (
        NO_STORE,
        Json(UpdatesResponse {
            build: BUILD,
            build_id: state.config.build_id.clone(),
            server_time: Utc::now(),
            max_events: core.log.max_events(),
            latest: core.store.snapshot(),
            events: core.log.query(limit, feed_filter.as_deref()),
        }),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryCounts {
    total_events: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResponse {
    build: &'static str,
    build_id: String,
    server_time: DateTime<Utc>,
    max_events: usize,
    counts: SummaryCounts,
    by_feed: BTreeMap<String, FeedSummary>,
    latest: Snapshot,
}

async fn get_summary(State(state): State<AppState>) -> impl IntoResponse {
    let core = state.core.lock().expect("state mutex poisoned");
    (
        NO_STORE,
        Json(SummaryResponse {
            build: BUILD,
            build_id: state.config.build_id.clone(),
            server_time: Utc::now(),
            max_events: core.log.max_events(),
            counts: SummaryCounts {
                total_events: core.log.len(),
            },
            by_feed: core.log.summarize(),
            latest: core.store.snapshot(),
        }),
    )
}

async fn get_overlay(Path(slug): Path<String>) -> Response {
    match Feed::from_slug(&slug) {
        Some(feed) => (
            [
                (header::CONTENT_SECURITY_POLICY, overlay::OVERLAY_CSP),
                (header::CACHE_CONTROL, "no-store"),
            ],
            Html(overlay::overlay_html(feed)),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, NO_STORE, "unknown overlay feed").into_response(),
    }
}

fn request_meta(addr: SocketAddr, headers: &HeaderMap) -> RequestMeta {
    let header_string = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    RequestMeta {
        ip: addr.ip().to_string(),
        xff: header_string("x-forwarded-for"),
        ua: header_string("user-agent"),
    }
}
