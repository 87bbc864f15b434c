//! Engagement tracking for applicants within program tracks.
//!
//! Statuses are derived from the appointments and invitations linked to a
//! program context and may be denormalized back onto it by the refresh worker;
//! recomputing them always reproduces the stored value.

pub mod action;
pub mod domain;
pub mod import;
pub mod refresh;
pub mod router;
pub mod service;
pub mod tracker;

#[cfg(test)]
mod tests;

pub use action::{requires_action, ActionRequiredFilter};
pub use domain::{
    Applicant, ApplicantId, Appointment, AppointmentId, AppointmentStatus, ContextId,
    ContextStatus, DepartmentId, ExternalAppointmentRef, Invitation, InvitationChannel,
    InvitationId, OrganisationId, Participation, ProgramContext, ProgramTrack,
};
pub use import::{ContextImportError, ContextImporter};
pub use refresh::{
    ChannelRefreshQueue, QueueError, RefreshQueue, RefreshStatusesTask, RefreshSummary,
    StatusRefreshWorker,
};
pub use router::engagement_router;
pub use service::{
    AppointmentSync, ContextFilter, ContextStatusView, EngagementService, EngagementServiceError,
    Participant,
};
pub use tracker::{
    derive_status, AppointmentEntry, ContextHistory, EngagementSnapshot, EngagementTracker,
    ResolvingAppointment,
};
