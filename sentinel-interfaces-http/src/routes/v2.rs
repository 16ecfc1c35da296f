use axum::Router;

use sentinel_application::AppState;

use crate::handlers::{detect_handlers, ops_handlers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v2/detect/run",
            axum::routing::post(detect_handlers::run_pass),
        )
        .route(
            "/v2/detect/checkpoint",
            axum::routing::get(detect_handlers::get_checkpoint),
        )
        .route(
            "/v2/detect/alerts",
            axum::routing::get(detect_handlers::list_alerts),
        )
        .route(
            "/v2/detect/alerts/summary",
            axum::routing::get(detect_handlers::alert_summary),
        )
        .route(
            "/v2/ops/health/live",
            axum::routing::get(ops_handlers::health_live),
        )
        .route(
            "/v2/ops/health/ready",
            axum::routing::get(ops_handlers::health_ready),
        )
        .route(
            "/v2/ops/metrics/prometheus",
            axum::routing::get(ops_handlers::metrics_prometheus),
        )
        .with_state(state)
}
