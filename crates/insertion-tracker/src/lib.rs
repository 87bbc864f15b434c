//! Engagement tracking, notification dispatch, and outcome statistics for
//! applicants enrolled in social-services programs.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
