/// Transport used to deliver one outbound message.
///
/// Implementations own their timeout policy; a timeout must surface as
/// [`GatewayError::Timeout`] rather than blocking indefinitely.
pub trait MessageGateway: Send + Sync {
    fn send(&self, phone_number: &str, content: &str) -> Result<(), GatewayError>;
}

/// Transport failure reported by a gateway.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("{}", .0.join(", "))]
    Rejected(Vec<String>),
    #[error("message gateway timed out")]
    Timeout,
    #[error("message gateway unavailable: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Messages reported by the gateway, kept verbatim.
    pub fn messages(&self) -> Vec<String> {
        match self {
            GatewayError::Rejected(messages) => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}
