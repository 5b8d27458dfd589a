//! HTTP entrypoints for wardend
//!
//! - `GET /confirm?serviceId=..&confirmationToken=..`: the link sent to
//!   creators; plain-text responses
//! - `POST /events`: a normalized creation event as JSON
//! - `POST /events/cloudtrail`: a raw CloudTrail record or EventBridge
//!   envelope, classified before ingestion
//! - `GET /healthz`: store health

mod handlers;

pub use handlers::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use warden_core::{EventClassifier, WardenCore};
use warden_util::Clock;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<WardenCore>,
    pub clock: Arc<dyn Clock>,
    pub classifier: Arc<dyn EventClassifier>,
}

impl AppState {
    pub fn new(core: Arc<WardenCore>, clock: Arc<dyn Clock>, classifier: Arc<dyn EventClassifier>) -> Self {
        Self {
            core,
            clock,
            classifier,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/confirm", get(confirm))
        .route("/events", post(ingest_event))
        .route("/events/cloudtrail", post(ingest_cloudtrail))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "HTTP server listening");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
