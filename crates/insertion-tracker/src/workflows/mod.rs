pub mod engagement;
pub mod notifications;
pub mod stats;
pub mod store;
