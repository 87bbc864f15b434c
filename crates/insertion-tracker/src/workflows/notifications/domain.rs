use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::engagement::domain::{ApplicantId, ExternalAppointmentRef};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(pub String);

/// Life-cycle event a notification is sent for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    RdvCreated,
    RdvUpdated,
    RdvCancelled,
    InvitationReminder,
}

impl NotificationEvent {
    pub const fn label(self) -> &'static str {
        match self {
            Self::RdvCreated => "rdv_created",
            Self::RdvUpdated => "rdv_updated",
            Self::RdvCancelled => "rdv_cancelled",
            Self::InvitationReminder => "invitation_reminder",
        }
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Idempotency key: at most one notification row exists per key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NotificationKey {
    pub event: NotificationEvent,
    pub applicant_id: ApplicantId,
    pub appointment_ref: Option<ExternalAppointmentRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Pending,
    Delivered,
    Failed,
}

impl DeliveryOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

/// Durable record of one attempted outbound send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub key: NotificationKey,
    pub outcome: DeliveryOutcome,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Notification {
    pub fn pending(id: NotificationId, key: NotificationKey, now: DateTime<Utc>) -> Self {
        Self {
            id,
            key,
            outcome: DeliveryOutcome::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_outcome(&self, outcome: DeliveryOutcome, now: DateTime<Utc>) -> Self {
        Self {
            outcome,
            updated_at: now,
            ..self.clone()
        }
    }
}
