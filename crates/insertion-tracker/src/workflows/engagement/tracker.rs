use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::domain::{
    ApplicantId, Appointment, AppointmentId, AppointmentStatus, ContextId, ContextStatus,
    Invitation, ProgramContext, ProgramTrack,
};
use crate::workflows::store::{OutcomeStore, StoreError};

/// An appointment linked to a context together with the applicant's own outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentEntry {
    pub appointment: Appointment,
    pub outcome: AppointmentStatus,
}

impl AppointmentEntry {
    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        self.appointment.is_in_the_future(now) && self.outcome.is_undetermined()
    }
}

/// Everything the status derivation reads for one program context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextHistory {
    pub appointments: Vec<AppointmentEntry>,
    pub invitations: Vec<Invitation>,
}

impl ContextHistory {
    /// Most recently created appointment; ties fall back to the identifier.
    pub fn latest_appointment(&self) -> Option<&AppointmentEntry> {
        self.appointments.iter().max_by(|left, right| {
            left.appointment
                .created_at
                .cmp(&right.appointment.created_at)
                .then_with(|| left.appointment.id.cmp(&right.appointment.id))
        })
    }

    pub fn last_invitation_sent_at(&self) -> Option<DateTime<Utc>> {
        self.invitations
            .iter()
            .map(|invitation| invitation.sent_at)
            .max()
    }

    /// The appointment that settled the context: the first one attended,
    /// otherwise the latest one cancelled.
    pub fn resolving_appointment(&self) -> Option<&AppointmentEntry> {
        let first_seen = self
            .appointments
            .iter()
            .filter(|entry| entry.outcome == AppointmentStatus::Seen)
            .min_by(|left, right| {
                left.appointment
                    .starts_at
                    .cmp(&right.appointment.starts_at)
                    .then_with(|| left.appointment.id.cmp(&right.appointment.id))
            });

        first_seen.or_else(|| {
            self.appointments
                .iter()
                .filter(|entry| entry.outcome.is_cancelled())
                .max_by(|left, right| {
                    left.appointment
                        .created_at
                        .cmp(&right.appointment.created_at)
                        .then_with(|| left.appointment.id.cmp(&right.appointment.id))
                })
        })
    }
}

/// Derive the engagement status from a context history.
///
/// The most recently created appointment decides, even while it is still
/// pending. A cancelled outcome is superseded by an invitation sent after
/// that appointment was booked.
pub fn derive_status(history: &ContextHistory, now: DateTime<Utc>) -> ContextStatus {
    let last_invitation = history.last_invitation_sent_at();

    let Some(latest) = history.latest_appointment() else {
        return match last_invitation {
            Some(_) => ContextStatus::InvitationPending,
            None => ContextStatus::NotInvited,
        };
    };

    if latest.outcome.is_undetermined() {
        return if latest.is_pending(now) {
            ContextStatus::RdvPending
        } else {
            ContextStatus::RdvNeedsStatusUpdate
        };
    }

    let reinvited =
        last_invitation.is_some_and(|sent_at| sent_at > latest.appointment.created_at);
    if latest.outcome.is_cancelled() && reinvited {
        return ContextStatus::InvitationPending;
    }

    ContextStatus::from_outcome(latest.outcome).unwrap_or(ContextStatus::RdvNeedsStatusUpdate)
}

/// Appointment summary carried by a snapshot for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvingAppointment {
    pub appointment_id: AppointmentId,
    pub status: AppointmentStatus,
    pub starts_at: DateTime<Utc>,
}

/// Point-in-time view of one program context, consumed by the action filter
/// and the statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagementSnapshot {
    pub context_id: ContextId,
    pub applicant_id: ApplicantId,
    pub track: ProgramTrack,
    pub created_at: DateTime<Utc>,
    pub status: ContextStatus,
    pub last_invitation_sent_at: Option<DateTime<Utc>>,
    pub resolving: Option<ResolvingAppointment>,
}

impl EngagementSnapshot {
    pub fn from_history(
        context: &ProgramContext,
        history: &ContextHistory,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            context_id: context.id.clone(),
            applicant_id: context.applicant_id.clone(),
            track: context.track.clone(),
            created_at: context.created_at,
            status: derive_status(history, now),
            last_invitation_sent_at: history.last_invitation_sent_at(),
            resolving: history
                .resolving_appointment()
                .map(|entry| ResolvingAppointment {
                    appointment_id: entry.appointment.id.clone(),
                    status: entry.outcome,
                    starts_at: entry.appointment.starts_at,
                }),
        }
    }

    /// Time between the context creation and the start of the appointment it
    /// was seen at.
    pub fn seen_delay(&self) -> Option<Duration> {
        self.resolving
            .as_ref()
            .filter(|resolving| resolving.status == AppointmentStatus::Seen)
            .map(|resolving| resolving.starts_at - self.created_at)
    }
}

/// Reads context histories from the store and derives their status.
pub struct EngagementTracker<S> {
    store: Arc<S>,
}

impl<S> EngagementTracker<S>
where
    S: OutcomeStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn history(&self, context: &ProgramContext) -> Result<ContextHistory, StoreError> {
        let mut appointments = Vec::new();
        for participation in self.store.participations_for_context(&context.id)? {
            // Participations pointing at a missing appointment are ignored.
            if let Some(appointment) = self.store.appointment(&participation.appointment_id)? {
                appointments.push(AppointmentEntry {
                    appointment,
                    outcome: participation.status,
                });
            }
        }

        let invitations = self.store.invitations_for_context(&context.id)?;

        Ok(ContextHistory {
            appointments,
            invitations,
        })
    }

    pub fn snapshot(
        &self,
        context: &ProgramContext,
        now: DateTime<Utc>,
    ) -> Result<EngagementSnapshot, StoreError> {
        let history = self.history(context)?;
        Ok(EngagementSnapshot::from_history(context, &history, now))
    }

    pub fn status(
        &self,
        context: &ProgramContext,
        now: DateTime<Utc>,
    ) -> Result<ContextStatus, StoreError> {
        let history = self.history(context)?;
        Ok(derive_status(&history, now))
    }

    /// Recompute the denormalized status and resolving link of a context,
    /// writing them back only when they changed.
    pub fn refresh(
        &self,
        context_id: &ContextId,
        now: DateTime<Utc>,
    ) -> Result<ProgramContext, StoreError> {
        let mut context = self
            .store
            .program_context(context_id)?
            .ok_or(StoreError::NotFound)?;
        let history = self.history(&context)?;
        let status = derive_status(&history, now);
        let resolving = history
            .resolving_appointment()
            .map(|entry| entry.appointment.id.clone());

        if context.status != status || context.resolving_appointment != resolving {
            tracing::debug!(
                context_id = %context.id,
                from = %context.status,
                to = %status,
                "program context status changed"
            );
            context.status = status;
            context.resolving_appointment = resolving;
            self.store.update_program_context(context.clone())?;
        }

        Ok(context)
    }
}
