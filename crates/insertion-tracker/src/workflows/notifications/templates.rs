use chrono::{DateTime, Utc};

use super::domain::NotificationEvent;
use crate::config::NotificationConfig;
use crate::workflows::engagement::domain::{Applicant, AppointmentStatus, ProgramTrack};

/// Content provider for one notification event.
pub trait NotificationTemplate: Send + Sync {
    fn event(&self) -> NotificationEvent;
    fn render(&self, applicant: &Applicant) -> String;
}

/// Appointment data rendered into appointment notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentDetails {
    pub starts_at: DateTime<Utc>,
    pub location: String,
}

impl AppointmentDetails {
    fn schedule(&self) -> String {
        self.starts_at.format("%d/%m/%Y à %Hh%M").to_string()
    }
}

/// Notice sent when an appointment is booked, moved, or cancelled.
#[derive(Debug, Clone)]
pub struct AppointmentNotice {
    event: NotificationEvent,
    details: AppointmentDetails,
    signature: String,
}

impl AppointmentNotice {
    pub fn created(details: AppointmentDetails, config: &NotificationConfig) -> Self {
        Self::new(NotificationEvent::RdvCreated, details, config)
    }

    pub fn updated(details: AppointmentDetails, config: &NotificationConfig) -> Self {
        Self::new(NotificationEvent::RdvUpdated, details, config)
    }

    pub fn cancelled(details: AppointmentDetails, config: &NotificationConfig) -> Self {
        Self::new(NotificationEvent::RdvCancelled, details, config)
    }

    fn new(
        event: NotificationEvent,
        details: AppointmentDetails,
        config: &NotificationConfig,
    ) -> Self {
        Self {
            event,
            details,
            signature: config.signature.clone(),
        }
    }
}

impl NotificationTemplate for AppointmentNotice {
    fn event(&self) -> NotificationEvent {
        self.event
    }

    fn render(&self, applicant: &Applicant) -> String {
        let body = match self.event {
            NotificationEvent::RdvCreated => format!(
                "Vous êtes convoqué(e) à un rendez-vous le {} au {}. Ce rendez-vous est obligatoire.",
                self.details.schedule(),
                self.details.location
            ),
            NotificationEvent::RdvUpdated => format!(
                "Votre rendez-vous a été modifié. Il aura lieu le {} au {}.",
                self.details.schedule(),
                self.details.location
            ),
            NotificationEvent::RdvCancelled => format!(
                "Votre rendez-vous du {} au {} a été annulé.",
                self.details.schedule(),
                self.details.location
            ),
            NotificationEvent::InvitationReminder => format!(
                "Rappel : votre rendez-vous a lieu le {} au {}.",
                self.details.schedule(),
                self.details.location
            ),
        };

        format!("{},\n{}\n{}", salutation(applicant), body, self.signature)
    }
}

/// Follow-up sent when an invitation went unanswered.
#[derive(Debug, Clone)]
pub struct InvitationReminder {
    track: ProgramTrack,
    booking_url: String,
    signature: String,
}

impl InvitationReminder {
    pub fn new(
        track: ProgramTrack,
        booking_url: impl Into<String>,
        config: &NotificationConfig,
    ) -> Self {
        Self {
            track,
            booking_url: booking_url.into(),
            signature: config.signature.clone(),
        }
    }
}

impl NotificationTemplate for InvitationReminder {
    fn event(&self) -> NotificationEvent {
        NotificationEvent::InvitationReminder
    }

    fn render(&self, applicant: &Applicant) -> String {
        format!(
            "{},\nVous avez été invité(e) à prendre rendez-vous ({}). Choisissez un créneau sur {}\n{}",
            salutation(applicant),
            self.track.label(),
            self.booking_url,
            self.signature
        )
    }
}

fn salutation(applicant: &Applicant) -> String {
    let name = applicant.full_name();
    if name.is_empty() {
        "Bonjour".to_string()
    } else {
        format!("Bonjour {}", name)
    }
}

/// Life-cycle change observed on an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentChange {
    Created,
    Rescheduled,
    StatusChanged {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}

/// Template to send for an appointment change, if any.
pub fn template_for_change(
    change: AppointmentChange,
    details: AppointmentDetails,
    config: &NotificationConfig,
) -> Option<AppointmentNotice> {
    match change {
        AppointmentChange::Created => Some(AppointmentNotice::created(details, config)),
        AppointmentChange::Rescheduled => Some(AppointmentNotice::updated(details, config)),
        AppointmentChange::StatusChanged { from, to }
            if to.is_cancelled() && !from.is_cancelled() =>
        {
            Some(AppointmentNotice::cancelled(details, config))
        }
        AppointmentChange::StatusChanged { .. } => None,
    }
}
