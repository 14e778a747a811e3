//! Funding Advisor Service — Binary Entrypoint
//! Boots the Axum HTTP server: catalog load, shared state, routes.

use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("funding_advisor=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op where the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let router = funding_advisor::app().await?;

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "funding advisor listening");

    axum::serve(listener, router).await?;
    Ok(())
}
