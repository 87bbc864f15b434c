use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use super::domain::{
    ApplicantId, AppointmentId, AppointmentStatus, ContextId, ContextStatus, ProgramTrack,
};
use super::tracker::{EngagementSnapshot, ResolvingAppointment};

#[derive(Debug)]
pub enum ContextImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: usize, reason: String },
}

impl std::fmt::Display for ContextImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextImportError::Io(err) => write!(f, "failed to read context export: {}", err),
            ContextImportError::Csv(err) => write!(f, "invalid context CSV data: {}", err),
            ContextImportError::InvalidRow { line, reason } => {
                write!(f, "invalid context export row {}: {}", line, reason)
            }
        }
    }
}

impl std::error::Error for ContextImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContextImportError::Io(err) => Some(err),
            ContextImportError::Csv(err) => Some(err),
            ContextImportError::InvalidRow { .. } => None,
        }
    }
}

impl From<std::io::Error> for ContextImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ContextImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads engagement exports into snapshots for offline statistics.
pub struct ContextImporter;

impl ContextImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<EngagementSnapshot>, ContextImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<EngagementSnapshot>, ContextImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut snapshots = Vec::new();

        for (index, record) in csv_reader.deserialize::<ContextRow>().enumerate() {
            let row = record?;
            // Header is line 1.
            let line = index + 2;
            snapshots.push(row.into_snapshot(line)?);
        }

        Ok(snapshots)
    }
}

#[derive(Debug, Deserialize)]
struct ContextRow {
    context_id: String,
    applicant_id: String,
    track: String,
    created_at: String,
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    last_invitation_sent_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    rdv_id: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    rdv_starts_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    rdv_status: Option<String>,
}

impl ContextRow {
    fn into_snapshot(self, line: usize) -> Result<EngagementSnapshot, ContextImportError> {
        let invalid = |reason: String| ContextImportError::InvalidRow { line, reason };

        let created_at = parse_datetime(&self.created_at)
            .ok_or_else(|| invalid(format!("unparseable created_at '{}'", self.created_at)))?;
        let status = ContextStatus::parse(&self.status)
            .ok_or_else(|| invalid(format!("unknown status '{}'", self.status)))?;
        let last_invitation_sent_at = match self.last_invitation_sent_at.as_deref() {
            Some(raw) => Some(parse_datetime(raw).ok_or_else(|| {
                invalid(format!("unparseable last_invitation_sent_at '{raw}'"))
            })?),
            None => None,
        };

        let resolving = match (self.rdv_starts_at.as_deref(), self.rdv_status.as_deref()) {
            (Some(starts_at), Some(rdv_status)) => {
                let starts_at = parse_datetime(starts_at)
                    .ok_or_else(|| invalid(format!("unparseable rdv_starts_at '{starts_at}'")))?;
                let status = AppointmentStatus::parse(rdv_status)
                    .ok_or_else(|| invalid(format!("unknown rdv_status '{rdv_status}'")))?;
                let appointment_id = self
                    .rdv_id
                    .unwrap_or_else(|| format!("{}-rdv", self.context_id));
                Some(ResolvingAppointment {
                    appointment_id: AppointmentId(appointment_id),
                    status,
                    starts_at,
                })
            }
            (None, None) => None,
            _ => {
                return Err(invalid(
                    "rdv_starts_at and rdv_status must be provided together".to_string(),
                ))
            }
        };

        Ok(EngagementSnapshot {
            context_id: ContextId(self.context_id),
            applicant_id: ApplicantId(self.applicant_id),
            track: ProgramTrack(self.track),
            created_at,
            status,
            last_invitation_sent_at,
            resolving,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}
