use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde_json::json;

use super::domain::ContextId;
use super::refresh::RefreshQueue;
use super::service::{ContextFilter, EngagementService, EngagementServiceError};
use crate::workflows::store::OutcomeStore;

/// Router builder exposing the context index and per-context status.
pub fn engagement_router<S, Q>(service: Arc<EngagementService<S, Q>>) -> Router
where
    S: OutcomeStore + 'static,
    Q: RefreshQueue + 'static,
{
    Router::new()
        .route("/api/v1/contexts", get(list_handler::<S, Q>))
        .route("/api/v1/contexts/:context_id", get(status_handler::<S, Q>))
        .with_state(service)
}

pub(crate) async fn list_handler<S, Q>(
    State(service): State<Arc<EngagementService<S, Q>>>,
    Query(filter): Query<ContextFilter>,
) -> Response
where
    S: OutcomeStore + 'static,
    Q: RefreshQueue + 'static,
{
    let now = Utc::now();
    match service.list_contexts(&filter, now) {
        Ok(snapshots) => {
            let views: Vec<_> = snapshots
                .iter()
                .map(|snapshot| service.view(snapshot, now))
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(other) => error_response(other),
    }
}

pub(crate) async fn status_handler<S, Q>(
    State(service): State<Arc<EngagementService<S, Q>>>,
    Path(context_id): Path<String>,
) -> Response
where
    S: OutcomeStore + 'static,
    Q: RefreshQueue + 'static,
{
    let now = Utc::now();
    match service.context_status(&ContextId(context_id), now) {
        Ok(snapshot) => (StatusCode::OK, axum::Json(service.view(&snapshot, now))).into_response(),
        Err(other) => error_response(other),
    }
}

fn error_response(error: EngagementServiceError) -> Response {
    let status = match error {
        EngagementServiceError::ContextNotFound(_) => StatusCode::NOT_FOUND,
        EngagementServiceError::Store(_) | EngagementServiceError::Queue(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
