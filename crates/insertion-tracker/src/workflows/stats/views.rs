use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::workflows::engagement::domain::ContextStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: ContextStatus,
    pub status_label: &'static str,
    pub human_label: &'static str,
    pub count: usize,
}

/// Seen rate for one window; `rate` is absent when no context is old enough.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRate {
    pub days: u32,
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub computed_at: DateTime<Utc>,
    pub contexts: usize,
    pub seen_rates: Vec<WindowRate>,
    pub average_seen_delay_days: Option<f64>,
    pub status_breakdown: Vec<StatusCount>,
}
