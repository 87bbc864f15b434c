use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::views::StatsReport;
use crate::workflows::engagement::{ContextFilter, EngagementService, RefreshQueue};
use crate::workflows::store::OutcomeStore;

/// Shared state of the statistics route.
pub struct StatsState<S, Q> {
    pub service: Arc<EngagementService<S, Q>>,
    pub windows: Vec<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StatsQuery {
    #[serde(default)]
    days: Option<u32>,
}

pub fn stats_router<S, Q>(state: Arc<StatsState<S, Q>>) -> Router
where
    S: OutcomeStore + 'static,
    Q: RefreshQueue + 'static,
{
    Router::new()
        .route("/api/v1/stats", get(stats_handler::<S, Q>))
        .with_state(state)
}

pub(crate) async fn stats_handler<S, Q>(
    State(state): State<Arc<StatsState<S, Q>>>,
    Query(query): Query<StatsQuery>,
) -> Response
where
    S: OutcomeStore + 'static,
    Q: RefreshQueue + 'static,
{
    let windows = match query.days {
        Some(0) => {
            let payload = json!({ "error": "days must be a positive number of days" });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
        Some(days) => vec![days],
        None => state.windows.clone(),
    };

    let now = Utc::now();
    match state.service.list_contexts(&ContextFilter::default(), now) {
        Ok(snapshots) => {
            let report = StatsReport::compute(&snapshots, &windows, now);
            (StatusCode::OK, axum::Json(report)).into_response()
        }
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
