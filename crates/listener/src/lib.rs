//! Laminate HTTP binding.
//!
//! Exposes one shared [`engine::Orchestrator`] over JSON:
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /analyze` | Detect issues and recommend layers |
//! | `POST /execute` | Run a layer set over submitted code |
//! | `GET /layers` | Static layer catalog |
//! | `GET /history?limit=N` | Recent runs and aggregate stats |
//! | `GET /health` | Liveness |
//!
//! Failures answer with a non-2xx status and a `{error, message}` body.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request decoding, status mapping, and socket handling
//! live here. Every domain decision is delegated to the orchestrator.

pub mod error;
pub mod routes;

use std::future::Future;
use std::sync::Arc;

use engine::Orchestrator;
use tokio::net::TcpListener;
use tracing::info;

pub use error::ApiError;
pub use routes::router;

/// State shared by every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    orchestrator: Arc<Orchestrator>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(addr = %addr, transformer = orchestrator.transformer_name(), "HTTP server listening");
    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(shutdown)
        .await
}
