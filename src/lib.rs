//! Alertline — patient-context-aware emergency SMS notification.
//!
//! Composes a compact clinical summary from a patient context, sends it to
//! registered emergency contacts over an SMS provider with retry/backoff,
//! and keeps an append-style audit trail of every attempt. Provider
//! credentials are encrypted at rest under a local vault key.
//!
//! Entry point for embedding applications is [`AlertService`]; the lower
//! layers (composer, dispatcher, store, transport) are public for callers
//! that need finer control.

pub mod compose;
pub mod config;
pub mod crypto;
pub mod db;
pub mod dispatch;
pub mod export;
pub mod models;
pub mod phone;
pub mod service;
pub mod transport;

pub use config::ServicePaths;
pub use dispatch::{AlertDispatcher, AlertError, RetryPolicy};
pub use models::{
    AlertFilter, DeliveryOutcome, DeliveryStatus, EmergencyAlert, EmergencyContact, ExportFormat,
    PatientContext, ReasonCode, TransportStatus, UrgencyLevel,
};
pub use service::AlertService;
pub use transport::{twilio::TwilioTransport, SmsTransport};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for host applications that have no subscriber of
/// their own. Respects `RUST_LOG`; falls back to info-level output for this
/// crate. Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
