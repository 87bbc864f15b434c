use crate::infra::{parse_date, reference_instant, LoggingMessageGateway};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use insertion_tracker::config::AppConfig;
use insertion_tracker::error::AppError;
use insertion_tracker::workflows::engagement::{
    Applicant, ApplicantId, Appointment, AppointmentId, AppointmentStatus, AppointmentSync,
    ChannelRefreshQueue, ContextFilter, ContextId, ContextImporter, DepartmentId,
    EngagementService, EngagementServiceError, EngagementTracker, ExternalAppointmentRef,
    Invitation, InvitationChannel, InvitationId, OrganisationId, Participant, Participation,
    ProgramContext, ProgramTrack, StatusRefreshWorker,
};
use insertion_tracker::workflows::notifications::{
    template_for_change, AppointmentChange, AppointmentDetails, AppointmentNotice, DispatchReport,
    InvitationReminder, NotificationDispatcher, NotificationTemplate,
};
use insertion_tracker::workflows::stats::StatsReport;
use insertion_tracker::workflows::store::{InMemoryOutcomeStore, OutcomeStore, StoreError};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_DEPARTMENT: &str = "drome";
const DEMO_LOCATION: &str = "Maison de l'emploi, 12 avenue Victor Hugo, Valence";
const DEMO_BOOKING_URL: &str = "https://rdv.example.org/prendre_rdv";

#[derive(Args, Debug)]
pub(crate) struct StatsArgs {
    /// Engagement CSV export (context_id, applicant_id, track, created_at, status, ...)
    #[arg(long)]
    pub(crate) contexts: PathBuf,
    /// Window in days; repeat for several windows (defaults to the configured windows)
    #[arg(long)]
    pub(crate) days: Vec<u32>,
    /// Reference date for the computation (defaults to now)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<chrono::NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for the demo (defaults to now)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<chrono::NaiveDate>,
}

pub(crate) fn run_stats(args: StatsArgs) -> Result<(), AppError> {
    let StatsArgs {
        contexts,
        days,
        today,
    } = args;

    let windows = if days.is_empty() {
        AppConfig::load()?.engagement.seen_rate_windows
    } else {
        days
    };
    let now = today.map(reference_instant).unwrap_or_else(Utc::now);

    let snapshots = ContextImporter::from_path(&contexts)?;
    let report = StatsReport::compute(&snapshots, &windows, now);

    println!("Source: {}", contexts.display());
    print!("{}", report.render_text());
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let now = args.today.map(reference_instant).unwrap_or_else(Utc::now);

    println!("Insertion tracker demo ({})", now.format("%Y-%m-%d"));

    let store = Arc::new(InMemoryOutcomeStore::default());
    let seeded = seed_demo_store(&store, now)?;

    let (queue, mut receiver) = ChannelRefreshQueue::channel();
    let service = EngagementService::new(store.clone(), Arc::new(queue), &config.engagement);

    // A reschedule arrives from the booking system after seeding.
    let rescheduled_at = now + Duration::days(4);
    service.record_appointment(AppointmentSync {
        appointment: Appointment {
            id: AppointmentId("rdv-demo-4".to_string()),
            external_ref: ExternalAppointmentRef(9004),
            organisation_id: OrganisationId("org-drome".to_string()),
            starts_at: rescheduled_at,
            duration_in_min: 45,
            status: AppointmentStatus::Unknown,
            created_at: now - Duration::days(2),
        },
        participants: vec![Participant {
            applicant_id: ApplicantId("applicant-demo-4".to_string()),
            context_id: ContextId("ctx-demo-4".to_string()),
            status: AppointmentStatus::Unknown,
        }],
    })?;

    let worker = StatusRefreshWorker::new(store.clone());
    let mut processed = 0;
    while let Ok(task) = receiver.try_recv() {
        let summary = worker
            .process(&task, now)
            .map_err(EngagementServiceError::from)?;
        processed += summary.refreshed;
    }

    println!("\nProgram contexts ({seeded} seeded, {processed} refreshed from the queue)");
    let snapshots = service.list_contexts(&ContextFilter::default(), now)?;
    for snapshot in &snapshots {
        let marker = if service.requires_action(snapshot, now) {
            " [action required]"
        } else {
            ""
        };
        println!(
            "- {} | {} | {}{}",
            snapshot.context_id,
            snapshot.track.label(),
            snapshot.status.human_label(),
            marker
        );
    }

    println!("\nNotifications");
    let gateway = Arc::new(LoggingMessageGateway::default());
    let dispatcher = NotificationDispatcher::new(store.clone(), gateway.clone());
    let department = DepartmentId(DEMO_DEPARTMENT.to_string());
    let details = AppointmentDetails {
        starts_at: rescheduled_at,
        location: DEMO_LOCATION.to_string(),
    };

    let mut sends: Vec<(&str, Box<dyn NotificationTemplate>, Option<ExternalAppointmentRef>)> =
        Vec::new();
    for change in [AppointmentChange::Created, AppointmentChange::Rescheduled] {
        let template = template_for_change(change, details.clone(), &config.notifications);
        if let Some(template) = template {
            sends.push((
                "applicant-demo-4",
                Box::new(template) as Box<dyn NotificationTemplate>,
                Some(ExternalAppointmentRef(9004)),
            ));
        }
    }
    // Replaying the booking confirmation reuses its notification record.
    sends.push((
        "applicant-demo-4",
        Box::new(AppointmentNotice::created(details.clone(), &config.notifications))
            as Box<dyn NotificationTemplate>,
        Some(ExternalAppointmentRef(9004)),
    ));
    for applicant_id in ["applicant-demo-3", "applicant-demo-5"] {
        sends.push((
            applicant_id,
            Box::new(InvitationReminder::new(
                ProgramTrack("rsa_orientation".to_string()),
                DEMO_BOOKING_URL,
                &config.notifications,
            )) as Box<dyn NotificationTemplate>,
            None,
        ));
    }

    for (applicant_id, template, reference) in &sends {
        let applicant = store
            .applicant(&ApplicantId(applicant_id.to_string()))
            .map_err(EngagementServiceError::from)?;
        let Some(applicant) = applicant else {
            continue;
        };
        let result =
            dispatcher.dispatch(template.as_ref(), &applicant, *reference, &department, now);
        let report = DispatchReport::from(&result);
        if report.success {
            println!("- {} -> {}: delivered", template.event(), applicant.id);
        } else {
            println!(
                "- {} -> {}: failed ({})",
                template.event(),
                applicant.id,
                report.errors.join("; ")
            );
        }
    }
    println!(
        "{} messages handed to the gateway, {} notification records stored",
        gateway.sent(),
        store.notifications().len()
    );

    println!();
    let report = StatsReport::compute(&snapshots, &config.engagement.seen_rate_windows, now);
    print!("{}", report.render_text());

    Ok(())
}

struct DemoContext {
    suffix: u8,
    first_name: &'static str,
    last_name: &'static str,
    phone_number: &'static str,
    created_days_ago: i64,
    invited_days_ago: Option<i64>,
    appointment: Option<DemoAppointment>,
}

struct DemoAppointment {
    created_days_ago: i64,
    starts_in_days: i64,
    status: AppointmentStatus,
}

fn demo_contexts() -> Vec<DemoContext> {
    vec![
        DemoContext {
            suffix: 1,
            first_name: "Camille",
            last_name: "Martin",
            phone_number: "+33600000001",
            created_days_ago: 40,
            invited_days_ago: Some(39),
            appointment: Some(DemoAppointment {
                created_days_ago: 38,
                starts_in_days: -37,
                status: AppointmentStatus::Seen,
            }),
        },
        DemoContext {
            suffix: 2,
            first_name: "Lucas",
            last_name: "Bernard",
            phone_number: "+33600000002",
            created_days_ago: 35,
            invited_days_ago: Some(34),
            appointment: Some(DemoAppointment {
                created_days_ago: 25,
                starts_in_days: -20,
                status: AppointmentStatus::Noshow,
            }),
        },
        DemoContext {
            suffix: 3,
            first_name: "Inès",
            last_name: "Petit",
            phone_number: "+33600000003",
            created_days_ago: 12,
            invited_days_ago: Some(6),
            appointment: None,
        },
        DemoContext {
            suffix: 4,
            first_name: "Hugo",
            last_name: "Robert",
            phone_number: "+33600000004",
            created_days_ago: 8,
            invited_days_ago: Some(7),
            appointment: Some(DemoAppointment {
                created_days_ago: 2,
                starts_in_days: 3,
                status: AppointmentStatus::Unknown,
            }),
        },
        DemoContext {
            suffix: 5,
            first_name: "Léa",
            last_name: "Moreau",
            phone_number: "",
            created_days_ago: 2,
            invited_days_ago: None,
            appointment: None,
        },
    ]
}

/// Seed the store with sample applicants and refresh their statuses.
pub(crate) fn seed_demo_store(
    store: &Arc<InMemoryOutcomeStore>,
    now: DateTime<Utc>,
) -> Result<usize, AppError> {
    let contexts = demo_contexts();
    let tracker = EngagementTracker::new(store.clone());

    for demo in &contexts {
        seed_context(store, demo, now).map_err(EngagementServiceError::from)?;
        let context_id = ContextId(format!("ctx-demo-{}", demo.suffix));
        tracker
            .refresh(&context_id, now)
            .map_err(EngagementServiceError::from)?;
    }

    Ok(contexts.len())
}

fn seed_context(
    store: &InMemoryOutcomeStore,
    demo: &DemoContext,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let applicant_id = ApplicantId(format!("applicant-demo-{}", demo.suffix));
    let context_id = ContextId(format!("ctx-demo-{}", demo.suffix));

    store.insert_applicant(Applicant {
        id: applicant_id.clone(),
        first_name: demo.first_name.to_string(),
        last_name: demo.last_name.to_string(),
        phone_number_formatted: demo.phone_number.to_string(),
        departments: BTreeSet::from([DepartmentId(DEMO_DEPARTMENT.to_string())]),
    })?;
    store.insert_program_context(ProgramContext::new(
        context_id.clone(),
        applicant_id.clone(),
        ProgramTrack("rsa_orientation".to_string()),
        now - Duration::days(demo.created_days_ago),
    ))?;

    if let Some(days_ago) = demo.invited_days_ago {
        store.insert_invitation(Invitation {
            id: InvitationId(format!("inv-demo-{}", demo.suffix)),
            context_id: context_id.clone(),
            channel: InvitationChannel::Sms,
            sent_at: now - Duration::days(days_ago),
        })?;
    }

    if let Some(appointment) = &demo.appointment {
        let appointment_id = AppointmentId(format!("rdv-demo-{}", demo.suffix));
        let created_at = now - Duration::days(appointment.created_days_ago);
        store.upsert_appointment(Appointment {
            id: appointment_id.clone(),
            external_ref: ExternalAppointmentRef(9000 + u64::from(demo.suffix)),
            organisation_id: OrganisationId("org-drome".to_string()),
            starts_at: now + Duration::days(appointment.starts_in_days),
            duration_in_min: 45,
            status: appointment.status,
            created_at,
        })?;
        store.upsert_participation(Participation {
            applicant_id,
            appointment_id,
            context_id,
            status: appointment.status,
            created_at,
        })?;
    }

    Ok(())
}
