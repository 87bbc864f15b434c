//! Storage seam shared by the engagement and notification workflows.
//!
//! The core never holds a live object graph: every relation (applicant to
//! departments, context to participations, participation to appointment) is
//! resolved by key through [`OutcomeStore`].

mod memory;

pub use memory::InMemoryOutcomeStore;

use chrono::{DateTime, Utc};

use super::engagement::domain::{
    Applicant, ApplicantId, Appointment, AppointmentId, ContextId, ContextStatus, Invitation,
    Participation, ProgramContext, ProgramTrack,
};
use super::notifications::domain::{Notification, NotificationKey};

/// Filter applied by the store when listing program contexts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextQuery {
    pub track: Option<ProgramTrack>,
    pub status: Option<ContextStatus>,
    pub applicant_id: Option<ApplicantId>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl ContextQuery {
    pub fn matches(&self, context: &ProgramContext) -> bool {
        self.track.as_ref().map_or(true, |track| &context.track == track)
            && self.status.map_or(true, |status| context.status == status)
            && self
                .applicant_id
                .as_ref()
                .map_or(true, |id| &context.applicant_id == id)
            && self
                .created_after
                .map_or(true, |after| context.created_at >= after)
            && self
                .created_before
                .map_or(true, |before| context.created_at < before)
    }
}

/// Durable store of applicants, appointments, invitations, and notifications.
pub trait OutcomeStore: Send + Sync {
    fn applicant(&self, id: &ApplicantId) -> Result<Option<Applicant>, StoreError>;
    fn program_context(&self, id: &ContextId) -> Result<Option<ProgramContext>, StoreError>;
    fn contexts(&self, query: &ContextQuery) -> Result<Vec<ProgramContext>, StoreError>;
    fn update_program_context(&self, context: ProgramContext) -> Result<(), StoreError>;

    fn appointment(&self, id: &AppointmentId) -> Result<Option<Appointment>, StoreError>;
    fn upsert_appointment(&self, appointment: Appointment) -> Result<(), StoreError>;
    fn participations_for_context(
        &self,
        context_id: &ContextId,
    ) -> Result<Vec<Participation>, StoreError>;
    fn upsert_participation(&self, participation: Participation) -> Result<(), StoreError>;

    fn invitations_for_context(&self, context_id: &ContextId)
        -> Result<Vec<Invitation>, StoreError>;
    fn insert_invitation(&self, invitation: Invitation) -> Result<(), StoreError>;

    /// Atomically return the notification stored under `key`, creating a
    /// pending one when absent. Concurrent callers converge on one row.
    fn find_or_create_notification(
        &self,
        key: &NotificationKey,
        now: DateTime<Utc>,
    ) -> Result<Notification, StoreError>;
    fn notification(&self, key: &NotificationKey) -> Result<Option<Notification>, StoreError>;
    fn update_notification(&self, notification: &Notification) -> Result<(), StoreError>;
    /// Record a failed send for `key` unless the stored row is already
    /// delivered, checked and written in one step. Returns the stored row.
    fn mark_notification_failed(
        &self,
        key: &NotificationKey,
        now: DateTime<Utc>,
    ) -> Result<Notification, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Messages suitable for direct display; validation messages are kept verbatim.
    pub fn messages(&self) -> Vec<String> {
        match self {
            StoreError::Validation(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}
