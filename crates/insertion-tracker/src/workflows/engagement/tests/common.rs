use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::config::EngagementConfig;
use crate::workflows::engagement::domain::{
    Applicant, ApplicantId, Appointment, AppointmentId, AppointmentStatus, ContextId,
    DepartmentId, ExternalAppointmentRef, Invitation, InvitationChannel, InvitationId,
    OrganisationId, ProgramContext, ProgramTrack,
};
use crate::workflows::engagement::refresh::{QueueError, RefreshQueue, RefreshStatusesTask};
use crate::workflows::engagement::service::{AppointmentSync, EngagementService, Participant};
use crate::workflows::store::InMemoryOutcomeStore;

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 11, 25, 12, 0, 0).unwrap()
}

pub(super) fn track() -> ProgramTrack {
    ProgramTrack("rsa_orientation".to_string())
}

pub(super) fn applicant(id: &str) -> Applicant {
    Applicant {
        id: ApplicantId(id.to_string()),
        first_name: "Jean".to_string(),
        last_name: "Valjean".to_string(),
        phone_number_formatted: "+33782605941".to_string(),
        departments: BTreeSet::from([DepartmentId("drome".to_string())]),
    }
}

/// Store holding one applicant per context id, each context created at `created_at`.
pub(super) fn store_with_contexts(
    context_ids: &[&str],
    created_at: DateTime<Utc>,
) -> Arc<InMemoryOutcomeStore> {
    let store = Arc::new(InMemoryOutcomeStore::default());
    for context_id in context_ids {
        let applicant_id = format!("applicant-{context_id}");
        store
            .insert_applicant(applicant(&applicant_id))
            .expect("seed applicant");
        store
            .insert_program_context(ProgramContext::new(
                ContextId(context_id.to_string()),
                ApplicantId(applicant_id),
                track(),
                created_at,
            ))
            .expect("seed context");
    }
    store
}

pub(super) fn applicant_of(context_id: &str) -> ApplicantId {
    ApplicantId(format!("applicant-{context_id}"))
}

pub(super) fn invitation(id: &str, context_id: &str, sent_at: DateTime<Utc>) -> Invitation {
    Invitation {
        id: InvitationId(id.to_string()),
        context_id: ContextId(context_id.to_string()),
        channel: InvitationChannel::Sms,
        sent_at,
    }
}

pub(super) fn appointment_sync(
    id: &str,
    external_ref: u64,
    context_id: &str,
    starts_at: DateTime<Utc>,
    status: AppointmentStatus,
    created_at: DateTime<Utc>,
) -> AppointmentSync {
    AppointmentSync {
        appointment: Appointment {
            id: AppointmentId(id.to_string()),
            external_ref: ExternalAppointmentRef(external_ref),
            organisation_id: OrganisationId("org-drome".to_string()),
            starts_at,
            duration_in_min: 30,
            status,
            created_at,
        },
        participants: vec![Participant {
            applicant_id: applicant_of(context_id),
            context_id: ContextId(context_id.to_string()),
            status,
        }],
    }
}

pub(super) fn build_service(
    store: Arc<InMemoryOutcomeStore>,
) -> (EngagementService<InMemoryOutcomeStore, RecordingQueue>, Arc<RecordingQueue>) {
    let queue = Arc::new(RecordingQueue::default());
    let service = EngagementService::new(store, queue.clone(), &EngagementConfig::default());
    (service, queue)
}

pub(super) fn days(count: i64) -> Duration {
    Duration::days(count)
}

#[derive(Default)]
pub(super) struct RecordingQueue {
    tasks: Mutex<Vec<RefreshStatusesTask>>,
}

impl RecordingQueue {
    pub(super) fn tasks(&self) -> Vec<RefreshStatusesTask> {
        self.tasks.lock().expect("queue mutex poisoned").clone()
    }
}

impl RefreshQueue for RecordingQueue {
    fn enqueue(&self, task: RefreshStatusesTask) -> Result<(), QueueError> {
        self.tasks
            .lock()
            .expect("queue mutex poisoned")
            .push(task);
        Ok(())
    }
}

pub(super) struct ClosedQueue;

impl RefreshQueue for ClosedQueue {
    fn enqueue(&self, _task: RefreshStatusesTask) -> Result<(), QueueError> {
        Err(QueueError::Closed)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
