//! Dispatch scenarios driven through the public notification API with the
//! in-memory store.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use insertion_tracker::config::NotificationConfig;
use insertion_tracker::workflows::engagement::{
    Applicant, ApplicantId, AppointmentStatus, DepartmentId, ExternalAppointmentRef,
};
use insertion_tracker::workflows::notifications::{
    template_for_change, AppointmentChange, AppointmentDetails, DeliveryOutcome, DispatchReport,
    GatewayError, MessageGateway, NotificationDispatcher, NotificationEvent,
};
use insertion_tracker::workflows::store::InMemoryOutcomeStore;

#[derive(Default)]
struct CountingGateway {
    messages: Mutex<Vec<(String, String)>>,
}

impl CountingGateway {
    fn count(&self) -> usize {
        self.messages.lock().expect("gateway mutex poisoned").len()
    }
}

impl MessageGateway for CountingGateway {
    fn send(&self, phone_number: &str, content: &str) -> Result<(), GatewayError> {
        self.messages
            .lock()
            .expect("gateway mutex poisoned")
            .push((phone_number.to_string(), content.to_string()));
        Ok(())
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 4, 25, 12, 0, 0).unwrap()
}

fn applicant(phone_number: &str) -> Applicant {
    Applicant {
        id: ApplicantId("applicant-42".to_string()),
        first_name: "Camille".to_string(),
        last_name: "Martin".to_string(),
        phone_number_formatted: phone_number.to_string(),
        departments: BTreeSet::from([DepartmentId("drome".to_string())]),
    }
}

fn details() -> AppointmentDetails {
    AppointmentDetails {
        starts_at: Utc.with_ymd_and_hms(2022, 5, 2, 14, 0, 0).unwrap(),
        location: "Maison de l'emploi, Valence".to_string(),
    }
}

fn setup() -> (
    NotificationDispatcher<InMemoryOutcomeStore, CountingGateway>,
    Arc<InMemoryOutcomeStore>,
    Arc<CountingGateway>,
) {
    let store = Arc::new(InMemoryOutcomeStore::default());
    store
        .insert_applicant(applicant("+33600000000"))
        .expect("applicant stored");
    let gateway = Arc::new(CountingGateway::default());
    let dispatcher = NotificationDispatcher::new(store.clone(), gateway.clone());
    (dispatcher, store, gateway)
}

#[test]
fn life_cycle_changes_dispatch_once_per_event() {
    let (dispatcher, store, gateway) = setup();
    let config = NotificationConfig::default();
    let department = DepartmentId("drome".to_string());
    let reference = Some(ExternalAppointmentRef(1337));

    let changes = [
        AppointmentChange::Created,
        AppointmentChange::Created,
        AppointmentChange::Rescheduled,
        AppointmentChange::StatusChanged {
            from: AppointmentStatus::Unknown,
            to: AppointmentStatus::Seen,
        },
        AppointmentChange::StatusChanged {
            from: AppointmentStatus::Unknown,
            to: AppointmentStatus::Excused,
        },
    ];

    let mut reports = Vec::new();
    for change in changes {
        if let Some(template) = template_for_change(change, details(), &config) {
            let result = dispatcher.dispatch(
                &template,
                &applicant("+33600000000"),
                reference,
                &department,
                now(),
            );
            reports.push(DispatchReport::from(&result));
        }
    }

    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|report| report.success && report.errors.is_empty()));
    assert_eq!(gateway.count(), 4);

    let notifications = store.notifications();
    let events: Vec<_> = notifications
        .iter()
        .map(|notification| notification.key.event)
        .collect();
    assert_eq!(
        events,
        vec![
            NotificationEvent::RdvCreated,
            NotificationEvent::RdvUpdated,
            NotificationEvent::RdvCancelled,
        ]
    );
    assert!(notifications
        .iter()
        .all(|notification| notification.outcome == DeliveryOutcome::Delivered));
}

#[test]
fn failures_are_reported_as_display_messages() {
    let (dispatcher, store, gateway) = setup();
    let template = template_for_change(
        AppointmentChange::Created,
        details(),
        &NotificationConfig::default(),
    )
    .expect("created notice");

    let other_department = dispatcher.dispatch(
        &template,
        &applicant("+33600000000"),
        None,
        &DepartmentId("ardeche".to_string()),
        now(),
    );
    let no_phone = dispatcher.dispatch(
        &template,
        &applicant(""),
        None,
        &DepartmentId("drome".to_string()),
        now(),
    );

    let report = serde_json::to_value(DispatchReport::from(&other_department))
        .expect("report serializes");
    assert_eq!(
        report,
        serde_json::json!({
            "success": false,
            "errors": ["applicant does not belong to the organisation and cannot be invited."]
        })
    );
    assert_eq!(
        DispatchReport::from(&no_phone).errors,
        vec!["phone number is not set.".to_string()]
    );
    assert_eq!(gateway.count(), 0);
    assert!(store.notifications().is_empty());
}
