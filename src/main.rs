//! Over/Under Overlay Service — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use overlay_status::api;
use overlay_status::{AppState, Config};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("overlay_status=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        build_id = %config.build_id,
        max_events = config.max_events,
        %addr,
        "starting overlay status service"
    );

    let state = AppState::new(config);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    // Per-connection peer addresses feed the update event log.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server exited")?;

    Ok(())
}
