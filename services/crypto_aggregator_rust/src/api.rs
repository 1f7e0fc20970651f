//! HTTP surface
//!
//! - `GET /health`, `GET /health/live`   liveness
//! - `GET /health/ready`                 503 until the first refresh cycle completes
//! - `GET /metrics`                      Prometheus text exposition
//! - `GET /fetch`                        current Layout Store snapshot
//! - `GET /aggregate`                    on-demand multi-provider aggregation

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use crypto_aggregator_core::{AggregateError, Aggregator, Layout, LayoutStore, Poller};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LayoutStore>,
    pub poller: Arc<Poller>,
    pub aggregator: Arc<Aggregator>,
    pub metrics: PrometheusHandle,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(live))
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
        .route("/metrics", get(metrics))
        .route("/fetch", get(fetch))
        .route("/aggregate", get(aggregate))
        .with_state(state)
}

async fn live() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let cycles = state.poller.completed_cycles();
    if cycles == 0 {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "starting" })),
        );
    }
    (StatusCode::OK, Json(json!({ "status": "ok", "cycles": cycles })))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn fetch(State(state): State<AppState>) -> Json<Layout> {
    Json(state.store.snapshot())
}

async fn aggregate(State(state): State<AppState>) -> Result<Json<Layout>, ApiError> {
    let layout = state.aggregator.execute().await?;
    info!("Aggregated {} layout rows", layout.len());
    Ok(Json(layout))
}

/// Aggregation failure rendered as a 502
#[derive(Debug)]
pub struct ApiError(AggregateError);

impl From<AggregateError> for ApiError {
    fn from(err: AggregateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Aggregation failed: {}", self.0);

        (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": self.0.kind(), "message": self.0.to_string() })),
        )
            .into_response()
    }
}
