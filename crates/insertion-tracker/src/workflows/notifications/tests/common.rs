use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::config::NotificationConfig;
use crate::workflows::engagement::domain::{
    Applicant, ApplicantId, Appointment, AppointmentId, ContextId, DepartmentId,
    ExternalAppointmentRef, Invitation, Participation, ProgramContext,
};
use crate::workflows::notifications::domain::{Notification, NotificationKey};
use crate::workflows::notifications::gateway::{GatewayError, MessageGateway};
use crate::workflows::notifications::templates::{AppointmentDetails, AppointmentNotice};
use crate::workflows::notifications::NotificationDispatcher;
use crate::workflows::store::{ContextQuery, InMemoryOutcomeStore, OutcomeStore, StoreError};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 4, 25, 12, 0, 0).unwrap()
}

pub(super) fn department() -> DepartmentId {
    DepartmentId("drome".to_string())
}

pub(super) fn applicant(phone_number: &str) -> Applicant {
    Applicant {
        id: ApplicantId("applicant-1".to_string()),
        first_name: "Jean".to_string(),
        last_name: "Valjean".to_string(),
        phone_number_formatted: phone_number.to_string(),
        departments: BTreeSet::from([department()]),
    }
}

pub(super) fn created_notice() -> AppointmentNotice {
    AppointmentNotice::created(
        AppointmentDetails {
            starts_at: Utc.with_ymd_and_hms(2022, 4, 28, 9, 30, 0).unwrap(),
            location: "12 rue des Lilas, Paris".to_string(),
        },
        &NotificationConfig::default(),
    )
}

pub(super) fn seeded_store() -> Arc<InMemoryOutcomeStore> {
    let store = Arc::new(InMemoryOutcomeStore::default());
    store
        .insert_applicant(applicant("+33782605941"))
        .expect("seed applicant");
    store
}

pub(super) fn build_dispatcher<S: OutcomeStore>(
    store: Arc<S>,
) -> (NotificationDispatcher<S, RecordingGateway>, Arc<RecordingGateway>) {
    let gateway = Arc::new(RecordingGateway::default());
    (NotificationDispatcher::new(store, gateway.clone()), gateway)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SentMessage {
    pub(super) phone_number: String,
    pub(super) content: String,
}

#[derive(Default)]
pub(super) struct RecordingGateway {
    sent: Mutex<Vec<SentMessage>>,
    failure: Mutex<Option<GatewayError>>,
}

impl RecordingGateway {
    pub(super) fn failing(error: GatewayError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Mutex::new(Some(error)),
        }
    }

    pub(super) fn recover(&self) {
        *self.failure.lock().expect("gateway mutex poisoned") = None;
    }

    pub(super) fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("gateway mutex poisoned").clone()
    }
}

impl MessageGateway for RecordingGateway {
    fn send(&self, phone_number: &str, content: &str) -> Result<(), GatewayError> {
        self.sent
            .lock()
            .expect("gateway mutex poisoned")
            .push(SentMessage {
                phone_number: phone_number.to_string(),
                content: content.to_string(),
            });
        match self.failure.lock().expect("gateway mutex poisoned").clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Gateway whose send lets a rival dispatcher deliver the same notification
/// first, then fails with `error`.
pub(super) struct RacingGateway {
    rival: NotificationDispatcher<InMemoryOutcomeStore, RecordingGateway>,
    reference: Option<ExternalAppointmentRef>,
    error: GatewayError,
}

impl RacingGateway {
    pub(super) fn new(
        store: Arc<InMemoryOutcomeStore>,
        reference: Option<ExternalAppointmentRef>,
        error: GatewayError,
    ) -> Self {
        let (rival, _) = build_dispatcher(store);
        Self {
            rival,
            reference,
            error,
        }
    }
}

impl MessageGateway for RacingGateway {
    fn send(&self, _phone_number: &str, _content: &str) -> Result<(), GatewayError> {
        self.rival
            .dispatch(
                &created_notice(),
                &applicant("+33782605941"),
                self.reference,
                &department(),
                now(),
            )
            .map_err(|failure| GatewayError::Transport(failure.messages().join(", ")))?;
        Err(self.error.clone())
    }
}

/// Store wrapper that rejects notification writes.
pub(super) struct RejectingNotificationStore {
    pub(super) inner: InMemoryOutcomeStore,
    pub(super) reject_create: Option<StoreError>,
    pub(super) reject_update: Option<StoreError>,
}

impl RejectingNotificationStore {
    pub(super) fn new(
        reject_create: Option<StoreError>,
        reject_update: Option<StoreError>,
    ) -> Self {
        let inner = InMemoryOutcomeStore::default();
        inner
            .insert_applicant(applicant("+33782605941"))
            .expect("seed applicant");
        Self {
            inner,
            reject_create,
            reject_update,
        }
    }
}

impl OutcomeStore for RejectingNotificationStore {
    fn applicant(&self, id: &ApplicantId) -> Result<Option<Applicant>, StoreError> {
        self.inner.applicant(id)
    }

    fn program_context(&self, id: &ContextId) -> Result<Option<ProgramContext>, StoreError> {
        self.inner.program_context(id)
    }

    fn contexts(&self, query: &ContextQuery) -> Result<Vec<ProgramContext>, StoreError> {
        self.inner.contexts(query)
    }

    fn update_program_context(&self, context: ProgramContext) -> Result<(), StoreError> {
        self.inner.update_program_context(context)
    }

    fn appointment(&self, id: &AppointmentId) -> Result<Option<Appointment>, StoreError> {
        self.inner.appointment(id)
    }

    fn upsert_appointment(&self, appointment: Appointment) -> Result<(), StoreError> {
        self.inner.upsert_appointment(appointment)
    }

    fn participations_for_context(
        &self,
        context_id: &ContextId,
    ) -> Result<Vec<Participation>, StoreError> {
        self.inner.participations_for_context(context_id)
    }

    fn upsert_participation(&self, participation: Participation) -> Result<(), StoreError> {
        self.inner.upsert_participation(participation)
    }

    fn invitations_for_context(
        &self,
        context_id: &ContextId,
    ) -> Result<Vec<Invitation>, StoreError> {
        self.inner.invitations_for_context(context_id)
    }

    fn insert_invitation(&self, invitation: Invitation) -> Result<(), StoreError> {
        self.inner.insert_invitation(invitation)
    }

    fn find_or_create_notification(
        &self,
        key: &NotificationKey,
        now: DateTime<Utc>,
    ) -> Result<Notification, StoreError> {
        match &self.reject_create {
            Some(error) => Err(error.clone()),
            None => self.inner.find_or_create_notification(key, now),
        }
    }

    fn notification(&self, key: &NotificationKey) -> Result<Option<Notification>, StoreError> {
        self.inner.notification(key)
    }

    fn update_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        match &self.reject_update {
            Some(error) => Err(error.clone()),
            None => self.inner.update_notification(notification),
        }
    }

    fn mark_notification_failed(
        &self,
        key: &NotificationKey,
        now: DateTime<Utc>,
    ) -> Result<Notification, StoreError> {
        match &self.reject_update {
            Some(error) => Err(error.clone()),
            None => self.inner.mark_notification_failed(key, now),
        }
    }
}
