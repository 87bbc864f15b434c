use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Identifier of a tracked applicant.
    ApplicantId
);
identifier!(DepartmentId);
identifier!(OrganisationId);
identifier!(
    /// Identifier of one applicant/track pairing.
    ContextId
);
identifier!(AppointmentId);
identifier!(InvitationId);

/// Reference of the appointment in the external booking system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalAppointmentRef(pub u64);

impl fmt::Display for ExternalAppointmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Program track an applicant is engaged in (e.g. `rsa_orientation`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramTrack(pub String);

impl ProgramTrack {
    pub fn label(&self) -> String {
        let mut words = self.0.split('_').filter(|word| !word.is_empty());
        let mut label = match words.next() {
            Some("rsa") => "RSA".to_string(),
            Some(first) => capitalize(first),
            None => return String::new(),
        };
        for word in words {
            label.push(' ');
            label.push_str(word);
        }
        label
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A tracked person and the departments they are affiliated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub first_name: String,
    pub last_name: String,
    pub phone_number_formatted: String,
    pub departments: BTreeSet<DepartmentId>,
}

impl Applicant {
    pub fn belongs_to(&self, department: &DepartmentId) -> bool {
        self.departments.contains(department)
    }

    pub fn has_phone_number(&self) -> bool {
        !self.phone_number_formatted.trim().is_empty()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Outcome recorded for an appointment, or for one applicant attending it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Unknown,
    Waiting,
    Seen,
    Excused,
    Revoked,
    Noshow,
}

impl AppointmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Waiting => "waiting",
            Self::Seen => "seen",
            Self::Excused => "excused",
            Self::Revoked => "revoked",
            Self::Noshow => "noshow",
        }
    }

    pub const fn human_label(self) -> &'static str {
        match self {
            Self::Unknown => "Statut du RDV à préciser",
            Self::Waiting => "En salle d'attente",
            Self::Seen => "Rendez-vous honoré",
            Self::Excused => "Annulé (excusé)",
            Self::Revoked => "Annulé (par le service)",
            Self::Noshow => "Absence non excusée",
        }
    }

    /// Outcome still to be determined.
    pub const fn is_undetermined(self) -> bool {
        matches!(self, Self::Unknown | Self::Waiting)
    }

    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::Excused | Self::Revoked | Self::Noshow)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "unknown" => Some(Self::Unknown),
            "waiting" => Some(Self::Waiting),
            "seen" => Some(Self::Seen),
            "excused" => Some(Self::Excused),
            "revoked" => Some(Self::Revoked),
            "noshow" => Some(Self::Noshow),
            _ => None,
        }
    }
}

/// A scheduled meeting mirrored from the booking system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub external_ref: ExternalAppointmentRef,
    pub organisation_id: OrganisationId,
    pub starts_at: DateTime<Utc>,
    pub duration_in_min: u32,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.starts_at + Duration::minutes(i64::from(self.duration_in_min))
    }

    pub fn is_in_the_future(&self, now: DateTime<Utc>) -> bool {
        self.starts_at > now
    }

    pub fn is_pending(&self, now: DateTime<Utc>) -> bool {
        self.is_in_the_future(now) && self.status.is_undetermined()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.is_cancelled()
    }
}

/// One applicant's attendance of one appointment, within one program context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    pub applicant_id: ApplicantId,
    pub appointment_id: AppointmentId,
    pub context_id: ContextId,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationChannel {
    Sms,
    Email,
    Postal,
}

impl InvitationChannel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
            Self::Postal => "postal",
        }
    }
}

/// Outreach attempt prompting the applicant to book an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub context_id: ContextId,
    pub channel: InvitationChannel,
    pub sent_at: DateTime<Utc>,
}

/// Derived engagement status of a program context.
///
/// Variants are declared in reporting order; labels match the values stored
/// in the denormalized `status` column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContextStatus {
    #[default]
    NotInvited,
    InvitationPending,
    RdvPending,
    RdvNeedsStatusUpdate,
    RdvSeen,
    RdvNoshow,
    RdvExcused,
    RdvRevoked,
}

impl ContextStatus {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::NotInvited,
            Self::InvitationPending,
            Self::RdvPending,
            Self::RdvNeedsStatusUpdate,
            Self::RdvSeen,
            Self::RdvNoshow,
            Self::RdvExcused,
            Self::RdvRevoked,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NotInvited => "not_invited",
            Self::InvitationPending => "invitation_pending",
            Self::RdvPending => "rdv_pending",
            Self::RdvNeedsStatusUpdate => "rdv_needs_status_update",
            Self::RdvSeen => "rdv_seen",
            Self::RdvNoshow => "rdv_noshow",
            Self::RdvExcused => "rdv_excused",
            Self::RdvRevoked => "rdv_revoked",
        }
    }

    pub const fn human_label(self) -> &'static str {
        match self {
            Self::NotInvited => "Non invité",
            Self::InvitationPending => "Invitation en attente de réponse",
            Self::RdvPending => "RDV pris",
            Self::RdvNeedsStatusUpdate => "Statut du RDV à préciser",
            Self::RdvSeen => "RDV honoré",
            Self::RdvNoshow => "Absence non excusée au RDV",
            Self::RdvExcused => "RDV annulé à l'initiative de l'allocataire",
            Self::RdvRevoked => "RDV annulé à l'initiative du service",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|status| status.label() == normalized)
    }

    /// Status reached once an appointment outcome is final.
    pub const fn from_outcome(outcome: AppointmentStatus) -> Option<Self> {
        match outcome {
            AppointmentStatus::Seen => Some(Self::RdvSeen),
            AppointmentStatus::Noshow => Some(Self::RdvNoshow),
            AppointmentStatus::Excused => Some(Self::RdvExcused),
            AppointmentStatus::Revoked => Some(Self::RdvRevoked),
            AppointmentStatus::Unknown | AppointmentStatus::Waiting => None,
        }
    }
}

impl fmt::Display for ContextStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Engagement record pairing one applicant with one program track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramContext {
    pub id: ContextId,
    pub applicant_id: ApplicantId,
    pub track: ProgramTrack,
    pub created_at: DateTime<Utc>,
    pub status: ContextStatus,
    pub resolving_appointment: Option<AppointmentId>,
}

impl ProgramContext {
    pub fn new(
        id: ContextId,
        applicant_id: ApplicantId,
        track: ProgramTrack,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            applicant_id,
            track,
            created_at,
            status: ContextStatus::NotInvited,
            resolving_appointment: None,
        }
    }
}
