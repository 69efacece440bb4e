use std::net::SocketAddr;

use anyhow::Result;
use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tracing::info;

use feedpost_core::Shutdown;

/// Liveness router
pub fn router() -> Router {
    Router::new().route("/healthz", get(healthz))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Bind the health endpoint; the returned address is the one actually bound
pub async fn bind(addr: &str) -> Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    Ok((listener, local_addr))
}

/// Serve `/healthz` until shutdown
pub async fn serve(listener: TcpListener, mut shutdown: Shutdown) -> Result<()> {
    info!("Health endpoint listening on http://{}/healthz", listener.local_addr()?);

    axum::serve(listener, router())
        .with_graceful_shutdown(async move { shutdown.triggered().await })
        .await?;

    info!("Health endpoint stopped");
    Ok(())
}
