use chrono::{DateTime, Duration, Utc};

use super::domain::ContextStatus;
use super::tracker::EngagementSnapshot;
use crate::config::EngagementConfig;

/// Grace period after which an unanswered invitation calls for follow-up.
pub const DEFAULT_ACTION_REQUIRED_AFTER_DAYS: i64 = 3;

/// Predicate flagging contexts whose invitation went unanswered too long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRequiredFilter {
    grace_period: Duration,
}

impl Default for ActionRequiredFilter {
    fn default() -> Self {
        Self::new(Duration::days(DEFAULT_ACTION_REQUIRED_AFTER_DAYS))
    }
}

impl ActionRequiredFilter {
    pub fn new(grace_period: Duration) -> Self {
        Self { grace_period }
    }

    pub fn from_config(config: &EngagementConfig) -> Self {
        Self::new(config.action_grace_period())
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// True iff an invitation is pending and the latest one was sent strictly
    /// more than the grace period before `now`.
    pub fn requires_action(&self, snapshot: &EngagementSnapshot, now: DateTime<Utc>) -> bool {
        if snapshot.status != ContextStatus::InvitationPending {
            return false;
        }

        snapshot
            .last_invitation_sent_at
            .is_some_and(|sent_at| now - sent_at > self.grace_period)
    }
}

/// Action-required check with the default three-day grace period.
pub fn requires_action(snapshot: &EngagementSnapshot, now: DateTime<Utc>) -> bool {
    ActionRequiredFilter::default().requires_action(snapshot, now)
}
