pub mod health;

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Health and metrics surface served next to the consumer loop.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::service_info))
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(prometheus_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Prometheus text exposition of the worker's counters.
async fn prometheus_metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}
