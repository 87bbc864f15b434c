use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Extension;
use axum::Json;
use insertion_tracker::workflows::engagement::{
    engagement_router, EngagementService, RefreshQueue,
};
use insertion_tracker::workflows::stats::{stats_router, StatsState};
use insertion_tracker::workflows::store::OutcomeStore;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_engagement_routes<S, Q>(
    service: Arc<EngagementService<S, Q>>,
    seen_rate_windows: Vec<u32>,
) -> axum::Router
where
    S: OutcomeStore + 'static,
    Q: RefreshQueue + 'static,
{
    let stats_state = Arc::new(StatsState {
        service: service.clone(),
        windows: seen_rate_windows,
    });

    engagement_router(service)
        .merge(stats_router(stats_state))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
