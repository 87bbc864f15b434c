//! Idempotent outbound notifications tied to appointment life-cycle events.

pub mod dispatcher;
pub mod domain;
pub mod gateway;
pub mod templates;

#[cfg(test)]
mod tests;

pub use dispatcher::{
    DispatchFailure, DispatchReport, NotificationDispatcher, MISSING_CONTACT_MESSAGE,
    NOT_AFFILIATED_MESSAGE,
};
pub use domain::{DeliveryOutcome, Notification, NotificationEvent, NotificationId, NotificationKey};
pub use gateway::{GatewayError, MessageGateway};
pub use templates::{
    template_for_change, AppointmentChange, AppointmentDetails, AppointmentNotice,
    InvitationReminder, NotificationTemplate,
};
