//! # Event Log
//! Bounded, insertion-ordered audit log of every update attempt, accepted or
//! rejected. Oldest entries are evicted FIFO once the configured capacity is
//! exceeded; that eviction is the system's only overload-shedding behavior.
//!
//! Summaries are recomputed from the live log on every call. The log is
//! bounded, so a full scan is cheap and there is nothing to invalidate.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::reading::OuReading;

/// Default number of events returned by a query when the caller sends no
/// usable limit.
pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// Group label for events whose normalized feed name came out empty.
pub const EMPTY_FEED_LABEL: &str = "(empty)";

/// Whether an event came from a single-feed or a bulk update request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Single,
    Bulk,
}

/// Request metadata captured alongside every update attempt.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Peer address as seen by the listener.
    pub ip: String,
    /// `X-Forwarded-For` header, when a reverse proxy supplied one.
    pub xff: Option<String>,
    /// `User-Agent` header.
    pub ua: Option<String>,
}

/// One observed update attempt. Immutable once recorded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvent {
    pub ts: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub ip: String,
    pub xff: Option<String>,
    pub ua: Option<String>,
    /// Normalized feed name; empty when the producer sent none.
    pub feed: String,
    /// Feed name exactly as received, before normalization.
    pub raw_feed: Option<String>,
    pub ou: OuReading,
    pub applied: bool,
}

/// Per-feed aggregate over the current log contents.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSummary {
    pub total: usize,
    pub applied: usize,
    pub ignored: usize,
    pub last_ts: Option<DateTime<Utc>>,
    pub last_ou: Option<OuReading>,
    pub last_raw_feed: Option<String>,
    pub last_ip: Option<String>,
    pub last_xff: Option<String>,
    pub last_ua: Option<String>,
}

#[derive(Debug)]
pub struct EventLog {
    buf: VecDeque<UpdateEvent>,
    max: usize,
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        let max = max_events.max(1);
        Self {
            buf: VecDeque::with_capacity(max),
            max,
        }
    }

    pub fn max_events(&self) -> usize {
        self.max
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append an event; evict from the front while over capacity.
    /// Recording never rejects.
    pub fn record(&mut self, event: UpdateEvent) {
        self.buf.push_back(event);
        while self.buf.len() > self.max {
            self.buf.pop_front();
        }
    }

    /// Most recent events, newest first, optionally restricted to one
    /// normalized feed name (exact match).
    ///
    /// `limit` is clamped to `[1, max_events]`; non-positive input falls back
    /// to [`DEFAULT_QUERY_LIMIT`].
    pub fn query(&self, limit: i64, feed: Option<&str>) -> Vec<UpdateEvent> {
        let limit = if limit <= 0 {
            DEFAULT_QUERY_LIMIT
        } else {
            limit as usize
        }
        .min(self.max);

        self.buf
            .iter()
            .rev()
            .filter(|e| feed.is_none_or(|f| e.feed == f))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Full-scan per-feed aggregate: counts plus the fields of the most
    /// recently appended event in each group. "Most recent" means highest
    /// insertion order; timestamps are monotonic with insertion here anyway.
    pub fn summarize(&self) -> BTreeMap<String, FeedSummary> {
        let mut by_feed: BTreeMap<String, FeedSummary> = BTreeMap::new();
        for e in &self.buf {
            let label = if e.feed.is_empty() {
                EMPTY_FEED_LABEL.to_string()
            } else {
                e.feed.clone()
            };
            let entry = by_feed.entry(label).or_default();
            entry.total += 1;
            if e.applied {
                entry.applied += 1;
            } else {
                entry.ignored += 1;
            }
            entry.last_ts = Some(e.ts);
            entry.last_ou = Some(e.ou);
            entry.last_raw_feed = e.raw_feed.clone();
            entry.last_ip = Some(e.ip.clone());
            entry.last_xff = e.xff.clone();
            entry.last_ua = e.ua.clone();
        }
        by_feed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn evt(i: i64, feed: &str, applied: bool) -> UpdateEvent {
        UpdateEvent {
            ts: t(i),
            kind: EventKind::Single,
            ip: "127.0.0.1".to_string(),
            xff: None,
            ua: Some("test-pusher".to_string()),
            feed: feed.to_string(),
            raw_feed: Some(feed.to_lowercase()),
            ou: OuReading::Number(i as f64),
            applied,
        }
    }

    #[test]
    fn length_never_exceeds_capacity() {
        let mut log = EventLog::new(5);
        for i in 0..50 {
            log.record(evt(i, "ASN", true));
            assert!(log.len() <= 5);
        }
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn eviction_is_fifo_and_survivors_are_the_newest() {
        let mut log = EventLog::new(3);
        for i in 0..7 {
            log.record(evt(i, "ASN", true));
        }
        // Survivors must be exactly the last 3 recorded, newest first.
        let out = log.query(10, None);
        let ts: Vec<_> = out.iter().map(|e| e.ts).collect();
        assert_eq!(ts, vec![t(6), t(5), t(4)]);
    }

    #[test]
    fn query_returns_min_of_limit_and_len_newest_first() {
        let mut log = EventLog::new(100);
        for i in 0..10 {
            log.record(evt(i, "ASN", true));
        }
        let out = log.query(4, None);
        assert_eq!(out.len(), 4);
        for pair in out.windows(2) {
            assert!(pair[0].ts >= pair[1].ts);
        }

        let all = log.query(50, None);
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn query_limit_is_clamped_to_capacity_and_defaults_when_non_positive() {
        let mut log = EventLog::new(4);
        for i in 0..10 {
            log.record(evt(i, "ASN", true));
        }
        assert_eq!(log.query(1_000, None).len(), 4);
        // Non-positive falls back to the default, then clamps to capacity.
        assert_eq!(log.query(0, None).len(), 4);
        assert_eq!(log.query(-3, None).len(), 4);
    }

    #[test]
    fn query_filters_on_exact_normalized_feed() {
        let mut log = EventLog::new(100);
        log.record(evt(0, "ASN", true));
        log.record(evt(1, "PUP", true));
        log.record(evt(2, "ASN", false));
        log.record(evt(3, "BOGUS", false));

        let asn = log.query(50, Some("ASN"));
        assert_eq!(asn.len(), 2);
        assert!(asn.iter().all(|e| e.feed == "ASN"));
        assert_eq!(asn[0].ts, t(2));

        assert!(log.query(50, Some("asn")).is_empty());
    }

    #[test]
    fn summary_counts_add_up() {
        let mut log = EventLog::new(100);
        log.record(evt(0, "ASN", true));
        log.record(evt(1, "ASN", false));
        log.record(evt(2, "PUP", true));
        log.record(evt(3, "BOGUS", false));
        log.record(evt(4, "", false));

        let summary = log.summarize();
        let mut total = 0;
        for s in summary.values() {
            assert_eq!(s.applied + s.ignored, s.total);
            total += s.total;
        }
        assert_eq!(total, log.len());

        let asn = &summary["ASN"];
        assert_eq!((asn.total, asn.applied, asn.ignored), (2, 1, 1));
        assert!(summary.contains_key(EMPTY_FEED_LABEL));
    }

    #[test]
    fn summary_last_fields_track_insertion_order() {
        let mut log = EventLog::new(100);
        log.record(evt(0, "ASN", true));
        log.record(evt(7, "ASN", false));

        let asn = &log.summarize()["ASN"];
        assert_eq!(asn.last_ts, Some(t(7)));
        assert_eq!(asn.last_ou, Some(OuReading::Number(7.0)));
        assert_eq!(asn.last_raw_feed.as_deref(), Some("asn"));
        assert_eq!(asn.last_ip.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn summary_of_empty_log_is_empty() {
        let log = EventLog::new(10);
        assert!(log.summarize().is_empty());
        assert!(log.is_empty());
    }
}
