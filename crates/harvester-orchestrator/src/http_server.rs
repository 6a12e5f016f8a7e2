//! HTTP surface of the orchestrator.
//!
//! Two routes: `GET /scrape?url=...` runs the full pipeline, and
//! `GET /health` answers liveness probes. Fetch failures map onto
//! gateway-style status codes so callers can distinguish a slow target
//! (504) from a broken one (502) and from a bad request (400).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::orchestrator::Orchestrator;
use harvester_common::protocol::{HarvestError, Result};

/// HTTP server wrapping an [`Orchestrator`].
pub struct HttpServer {
    orchestrator: Arc<Orchestrator>,
}

#[derive(Deserialize)]
struct ScrapeParams {
    url: Option<String>,
}

impl HttpServer {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// The route table, exposed separately so tests can serve it on an
    /// ephemeral listener.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/scrape", get(handle_scrape))
            .route("/health", get(handle_health))
            .layer(CorsLayer::permissive())
            .with_state(self.orchestrator.clone())
    }

    /// Binds `addr` and serves until shutdown.
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let app = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HarvestError::Connection(format!("failed to bind {}: {}", addr, e)))?;

        let local = listener
            .local_addr()
            .map_err(|e| HarvestError::Connection(format!("failed to read local addr: {}", e)))?;
        info!("Orchestrator HTTP server listening on {}", local);

        axum::serve(listener, app)
            .await
            .map_err(|e| HarvestError::Connection(format!("server error: {}", e)))?;

        Ok(())
    }
}

async fn handle_scrape(
    State(orchestrator): State<Arc<Orchestrator>>,
    Query(params): Query<ScrapeParams>,
) -> (StatusCode, Json<Value>) {
    let Some(url) = params.url else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "URL parameter is required"})),
        );
    };

    match orchestrator.scrape(&url).await {
        Ok(result) => (StatusCode::OK, Json(result)),
        Err(e) => {
            tracing::error!(url, error = %e, "scrape failed");
            let status = match &e {
                HarvestError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                HarvestError::FetchTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                HarvestError::Fetch(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(json!({"error": e.to_string(), "status": "failed"})),
            )
        }
    }
}

async fn handle_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "orchestrator"}))
}
