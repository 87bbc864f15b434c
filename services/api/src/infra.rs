use chrono::{DateTime, NaiveDate, Utc};
use insertion_tracker::workflows::notifications::{GatewayError, MessageGateway};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Gateway that records outbound messages in the service log instead of
/// calling an SMS provider.
#[derive(Debug, Default)]
pub(crate) struct LoggingMessageGateway {
    sent: AtomicUsize,
}

impl LoggingMessageGateway {
    pub(crate) fn sent(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }
}

impl MessageGateway for LoggingMessageGateway {
    fn send(&self, phone_number: &str, content: &str) -> Result<(), GatewayError> {
        if !phone_number.starts_with('+') {
            return Err(GatewayError::Rejected(vec![format!(
                "phone number {phone_number} is not in international format"
            )]));
        }
        self.sent.fetch_add(1, Ordering::Relaxed);
        info!(
            phone_number,
            characters = content.chars().count(),
            "sms handed to logging gateway"
        );
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Noon UTC on `date`, used as the reference instant for date-only inputs.
pub(crate) fn reference_instant(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(12, 0, 0)
        .map(|naive| naive.and_utc())
        .unwrap_or_else(Utc::now)
}
