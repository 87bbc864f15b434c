use chrono::{DateTime, Utc};

use super::outcome_rate::{average_seen_delay_days, rate_of_seen_within_window, status_breakdown};
use super::views::{StatsReport, WindowRate};
use crate::workflows::engagement::tracker::EngagementSnapshot;

impl StatsReport {
    pub fn compute(snapshots: &[EngagementSnapshot], windows: &[u32], now: DateTime<Utc>) -> Self {
        let seen_rates = windows
            .iter()
            .map(|&days| WindowRate {
                days,
                rate: rate_of_seen_within_window(snapshots, days, now),
            })
            .collect();

        Self {
            computed_at: now,
            contexts: snapshots.len(),
            seen_rates,
            average_seen_delay_days: average_seen_delay_days(snapshots),
            status_breakdown: status_breakdown(snapshots),
        }
    }

    /// Plain-text rendering used by the CLI.
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "Engagement statistics ({} contexts, computed {})\n",
            self.contexts,
            self.computed_at.format("%Y-%m-%d")
        );
        for window in &self.seen_rates {
            let rate = window
                .rate
                .map_or_else(|| "n/a".to_string(), |rate| format!("{rate:.2}%"));
            out.push_str(&format!("  seen within {} days: {}\n", window.days, rate));
        }
        let delay = self
            .average_seen_delay_days
            .map_or_else(|| "n/a".to_string(), |delay| format!("{delay:.1} days"));
        out.push_str(&format!("  average seen delay: {delay}\n"));
        for entry in &self.status_breakdown {
            out.push_str(&format!("  {:<24} {}\n", entry.status_label, entry.count));
        }
        out
    }
}
