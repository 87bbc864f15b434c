use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{DeliveryOutcome, Notification, NotificationKey};
use super::gateway::{GatewayError, MessageGateway};
use super::templates::NotificationTemplate;
use crate::workflows::engagement::domain::{Applicant, DepartmentId, ExternalAppointmentRef};
use crate::workflows::store::{OutcomeStore, StoreError};

pub const NOT_AFFILIATED_MESSAGE: &str =
    "applicant does not belong to the organisation and cannot be invited.";
pub const MISSING_CONTACT_MESSAGE: &str = "phone number is not set.";

/// First failing dispatch step, carrying displayable messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchFailure {
    #[error("{}", NOT_AFFILIATED_MESSAGE)]
    NotAffiliated,
    #[error("{}", MISSING_CONTACT_MESSAGE)]
    MissingContact,
    #[error("{}", .0.join(", "))]
    Persistence(Vec<String>),
    #[error("{}", .0.join(", "))]
    Gateway(Vec<String>),
}

impl DispatchFailure {
    pub fn messages(&self) -> Vec<String> {
        match self {
            DispatchFailure::Persistence(messages) | DispatchFailure::Gateway(messages) => {
                messages.clone()
            }
            other => vec![other.to_string()],
        }
    }
}

impl From<StoreError> for DispatchFailure {
    fn from(err: StoreError) -> Self {
        DispatchFailure::Persistence(err.messages())
    }
}

impl From<GatewayError> for DispatchFailure {
    fn from(err: GatewayError) -> Self {
        DispatchFailure::Gateway(err.messages())
    }
}

/// Serialisable summary of one dispatch call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub success: bool,
    pub errors: Vec<String>,
}

impl From<&Result<Notification, DispatchFailure>> for DispatchReport {
    fn from(result: &Result<Notification, DispatchFailure>) -> Self {
        match result {
            Ok(_) => Self {
                success: true,
                errors: Vec::new(),
            },
            Err(failure) => Self {
                success: false,
                errors: failure.messages(),
            },
        }
    }
}

/// Sends one outbound message per notification key and records the outcome.
///
/// Only the bookkeeping row is deduplicated: a retry that finds an existing
/// row still performs a transport send. The store's atomic
/// [`OutcomeStore::find_or_create_notification`] is the only guard against
/// duplicate rows; the dispatcher holds no lock of its own.
pub struct NotificationDispatcher<S, G>
where
    S: OutcomeStore,
    G: MessageGateway,
{
    store: Arc<S>,
    gateway: Arc<G>,
}

impl<S, G> NotificationDispatcher<S, G>
where
    S: OutcomeStore,
    G: MessageGateway,
{
    pub fn new(store: Arc<S>, gateway: Arc<G>) -> Self {
        Self { store, gateway }
    }

    pub fn dispatch(
        &self,
        template: &dyn NotificationTemplate,
        applicant: &Applicant,
        appointment_ref: Option<ExternalAppointmentRef>,
        department: &DepartmentId,
        now: DateTime<Utc>,
    ) -> Result<Notification, DispatchFailure> {
        let event = template.event();

        if !applicant.belongs_to(department) {
            debug!(
                event = event.label(),
                applicant_id = %applicant.id,
                department = %department,
                "notification skipped: applicant not affiliated"
            );
            return Err(DispatchFailure::NotAffiliated);
        }

        if !applicant.has_phone_number() {
            debug!(
                event = event.label(),
                applicant_id = %applicant.id,
                "notification skipped: no phone number"
            );
            return Err(DispatchFailure::MissingContact);
        }

        let key = NotificationKey {
            event,
            applicant_id: applicant.id.clone(),
            appointment_ref,
        };
        let notification = self.store.find_or_create_notification(&key, now)?;

        let content = template.render(applicant);
        if let Err(err) = self
            .gateway
            .send(applicant.phone_number_formatted.trim(), &content)
        {
            warn!(
                event = event.label(),
                applicant_id = %applicant.id,
                notification_id = %notification.id.0,
                error = %err,
                "message gateway rejected notification"
            );
            self.mark_failed(&key, now);
            return Err(err.into());
        }

        let delivered = notification.with_outcome(DeliveryOutcome::Delivered, now);
        self.store.update_notification(&delivered)?;

        info!(
            event = event.label(),
            applicant_id = %applicant.id,
            notification_id = %delivered.id.0,
            "notification delivered"
        );
        Ok(delivered)
    }

    fn mark_failed(&self, key: &NotificationKey, now: DateTime<Utc>) {
        if let Err(err) = self.store.mark_notification_failed(key, now) {
            warn!(
                event = key.event.label(),
                applicant_id = %key.applicant_id,
                error = %err,
                "unable to record failed notification"
            );
        }
    }
}
