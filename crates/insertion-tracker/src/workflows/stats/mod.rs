//! Windowed outcome statistics over engagement snapshots.

pub mod outcome_rate;
pub mod router;
mod summary;
pub mod views;

pub use outcome_rate::{average_seen_delay_days, rate_of_seen_within_window, status_breakdown};
pub use router::{stats_router, StatsState};
pub use views::{StatsReport, StatusCount, WindowRate};
