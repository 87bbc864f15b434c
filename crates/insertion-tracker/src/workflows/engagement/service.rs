use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::action::ActionRequiredFilter;
use super::domain::{
    ApplicantId, Appointment, AppointmentStatus, ContextId, ContextStatus, Invitation,
    Participation, ProgramTrack,
};
use super::refresh::{QueueError, RefreshQueue, RefreshStatusesTask};
use super::tracker::{EngagementSnapshot, EngagementTracker};
use crate::config::EngagementConfig;
use crate::workflows::store::{ContextQuery, OutcomeStore, StoreError};

/// One applicant attached to a synchronized appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub applicant_id: ApplicantId,
    pub context_id: ContextId,
    pub status: AppointmentStatus,
}

/// Appointment pushed by the booking system, with the applicants attending it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSync {
    pub appointment: Appointment,
    pub participants: Vec<Participant>,
}

/// List filter used by the context index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContextFilter {
    #[serde(default)]
    pub track: Option<ProgramTrack>,
    #[serde(default)]
    pub status: Option<ContextStatus>,
    #[serde(default)]
    pub action_required: bool,
    #[serde(default)]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_before: Option<DateTime<Utc>>,
}

/// Public representation of a context's engagement.
#[derive(Debug, Clone, Serialize)]
pub struct ContextStatusView {
    pub context_id: ContextId,
    pub applicant_id: ApplicantId,
    pub track: ProgramTrack,
    pub track_label: String,
    pub status: &'static str,
    pub status_label: &'static str,
    pub action_required: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_invitation_sent_at: Option<DateTime<Utc>>,
}

/// Service composing the store, the tracker, and the refresh queue.
pub struct EngagementService<S, Q> {
    store: Arc<S>,
    queue: Arc<Q>,
    tracker: EngagementTracker<S>,
    filter: ActionRequiredFilter,
}

impl<S, Q> EngagementService<S, Q>
where
    S: OutcomeStore + 'static,
    Q: RefreshQueue + 'static,
{
    pub fn new(store: Arc<S>, queue: Arc<Q>, config: &EngagementConfig) -> Self {
        let tracker = EngagementTracker::new(store.clone());
        Self {
            store,
            queue,
            tracker,
            filter: ActionRequiredFilter::from_config(config),
        }
    }

    pub fn tracker(&self) -> &EngagementTracker<S> {
        &self.tracker
    }

    pub fn requires_action(&self, snapshot: &EngagementSnapshot, now: DateTime<Utc>) -> bool {
        self.filter.requires_action(snapshot, now)
    }

    /// Current engagement of one context, derived from the store.
    pub fn context_status(
        &self,
        context_id: &ContextId,
        now: DateTime<Utc>,
    ) -> Result<EngagementSnapshot, EngagementServiceError> {
        let context = self
            .store
            .program_context(context_id)?
            .ok_or_else(|| EngagementServiceError::ContextNotFound(context_id.clone()))?;
        Ok(self.tracker.snapshot(&context, now)?)
    }

    /// Contexts matching the filter. Status and action-required filters apply
    /// to the freshly derived status, not the denormalized column.
    pub fn list_contexts(
        &self,
        filter: &ContextFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<EngagementSnapshot>, EngagementServiceError> {
        let query = ContextQuery {
            track: filter.track.clone(),
            created_after: filter.created_after,
            created_before: filter.created_before,
            ..ContextQuery::default()
        };

        let mut snapshots = Vec::new();
        for context in self.store.contexts(&query)? {
            let snapshot = self.tracker.snapshot(&context, now)?;
            if filter.status.is_some_and(|status| snapshot.status != status) {
                continue;
            }
            if filter.action_required && !self.filter.requires_action(&snapshot, now) {
                continue;
            }
            snapshots.push(snapshot);
        }

        Ok(snapshots)
    }

    pub fn view(&self, snapshot: &EngagementSnapshot, now: DateTime<Utc>) -> ContextStatusView {
        ContextStatusView {
            context_id: snapshot.context_id.clone(),
            applicant_id: snapshot.applicant_id.clone(),
            track: snapshot.track.clone(),
            track_label: snapshot.track.label(),
            status: snapshot.status.label(),
            status_label: snapshot.status.human_label(),
            action_required: self.filter.requires_action(snapshot, now),
            created_at: snapshot.created_at,
            last_invitation_sent_at: snapshot.last_invitation_sent_at,
        }
    }

    /// Store an appointment and its participations, then enqueue a refresh
    /// of every affected context.
    pub fn record_appointment(
        &self,
        sync: AppointmentSync,
    ) -> Result<RefreshStatusesTask, EngagementServiceError> {
        let AppointmentSync {
            appointment,
            participants,
        } = sync;

        let appointment_id = appointment.id.clone();
        let created_at = appointment.created_at;
        self.store.upsert_appointment(appointment)?;

        let mut task = RefreshStatusesTask::default();
        for participant in participants {
            self.store.upsert_participation(Participation {
                applicant_id: participant.applicant_id.clone(),
                appointment_id: appointment_id.clone(),
                context_id: participant.context_id.clone(),
                status: participant.status,
                created_at,
            })?;
            if !task.applicant_ids.contains(&participant.applicant_id) {
                task.applicant_ids.push(participant.applicant_id);
            }
            if !task.context_ids.contains(&participant.context_id) {
                task.context_ids.push(participant.context_id);
            }
        }

        if !task.is_empty() {
            info!(
                appointment_id = %appointment_id,
                contexts = task.context_ids.len(),
                "enqueuing status refresh after appointment sync"
            );
            self.queue.enqueue(task.clone())?;
        }

        Ok(task)
    }

    pub fn record_invitation(&self, invitation: Invitation) -> Result<(), EngagementServiceError> {
        let context_id = invitation.context_id.clone();
        self.store.insert_invitation(invitation)?;
        self.queue
            .enqueue(RefreshStatusesTask::for_contexts(vec![context_id]))?;
        Ok(())
    }

    /// Synchronously recompute and persist a context's status.
    pub fn refresh_context(
        &self,
        context_id: &ContextId,
        now: DateTime<Utc>,
    ) -> Result<EngagementSnapshot, EngagementServiceError> {
        let context = self.tracker.refresh(context_id, now).map_err(|err| match err {
            StoreError::NotFound => EngagementServiceError::ContextNotFound(context_id.clone()),
            other => EngagementServiceError::Store(other),
        })?;
        Ok(self.tracker.snapshot(&context, now)?)
    }
}

/// Error raised by the engagement service.
#[derive(Debug, thiserror::Error)]
pub enum EngagementServiceError {
    #[error("program context {0} not found")]
    ContextNotFound(ContextId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}
