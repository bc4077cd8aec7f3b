pub mod mock;
pub mod twilio;

pub use mock::MockTransport;
pub use twilio::TwilioTransport;

use thiserror::Error;

use crate::models::{ReasonCode, TransportCredentials};

/// Boundary abstraction over the SMS provider. The only component that
/// performs network I/O; injected into the dispatcher as a capability,
/// never looked up from global state.
///
/// Implementations are blocking — the dispatcher runs them on a worker
/// thread so interactive callers are never blocked.
pub trait SmsTransport: Send + Sync {
    /// Submit one message. An `Ok` receipt means the provider accepted the
    /// message for delivery, not that it was delivered.
    fn send_sms(
        &self,
        creds: &TransportCredentials,
        to: &str,
        body: &str,
    ) -> Result<ProviderReceipt, TransportError>;

    /// Query the provider for the delivery state of an accepted message.
    fn fetch_status(
        &self,
        creds: &TransportCredentials,
        message_ref: &str,
    ) -> Result<ProviderDeliveryState, TransportError>;
}

/// Provider acknowledgment of an accepted send
#[derive(Debug, Clone)]
pub struct ProviderReceipt {
    pub message_ref: String,
}

/// Provider-reported delivery state for an accepted message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderDeliveryState {
    /// Still queued or in transit
    InFlight,
    Delivered,
    Undelivered,
}

/// Transport failures. Display strings never contain credential material.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("provider unavailable (HTTP {status})")]
    ProviderUnavailable { status: u16 },

    /// The provider answered 2xx but the body was unreadable. Not retried:
    /// the message may already have been accepted, and a retry could
    /// double-send.
    #[error("unreadable provider response: {0}")]
    MalformedResponse(String),

    #[error("authentication rejected by provider")]
    AuthRejected,

    #[error("recipient rejected by provider")]
    RecipientRejected,

    #[error("provider rate limit exceeded")]
    RateLimited,

    #[error("provider error (HTTP {status})")]
    ProviderError { status: u16 },
}

impl TransportError {
    /// Transient failures are retried with backoff; permanent ones are
    /// surfaced immediately since retrying cannot change the outcome.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::ProviderUnavailable { .. }
        )
    }

    /// Reason code recorded in the audit trail
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            Self::Network(_) => ReasonCode::NetworkError,
            Self::Timeout(_) => ReasonCode::Timeout,
            Self::ProviderUnavailable { .. } => ReasonCode::ProviderUnavailable,
            Self::MalformedResponse(_) => ReasonCode::ProviderError,
            Self::AuthRejected => ReasonCode::AuthRejected,
            Self::RecipientRejected => ReasonCode::RecipientRejected,
            Self::RateLimited => ReasonCode::RateLimited,
            Self::ProviderError { .. } => ReasonCode::ProviderError,
        }
    }
}
