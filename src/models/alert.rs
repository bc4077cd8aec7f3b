use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::RedactedSnapshot;
use super::enums::{DeliveryStatus, ReasonCode, UrgencyLevel};

/// One audit record per send attempt. Immutable once written, except the
/// single status refinement `Sent -> Delivered | Undelivered` which updates
/// the same row in place (identifier stability).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub id: Uuid,
    /// Creation instant, UTC
    pub created_at: NaiveDateTime,
    /// Opaque case identifier — never a patient name
    pub case_reference: String,
    pub urgency: UrgencyLevel,
    /// Rendered message text as handed to the transport
    pub message: String,
    pub recipient: String,
    pub status: DeliveryStatus,
    /// Provider message reference, present only on an accepted send
    pub message_ref: Option<String>,
    pub reason: Option<ReasonCode>,
    /// Total transport attempts folded into this record (0 when validation
    /// short-circuited before any transport call)
    pub attempts: u32,
    pub notes: String,
    /// Anonymization-policy-permitted subset of the patient context
    pub context: RedactedSnapshot,
}

/// What the caller of `send_alert` gets back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    /// Identifier of the audit record written for this attempt
    pub alert_id: Uuid,
    pub status: DeliveryStatus,
    pub message_ref: Option<String>,
    pub reason: Option<ReasonCode>,
    pub attempts: u32,
    pub timestamp: NaiveDateTime,
}

impl DeliveryOutcome {
    pub fn from_alert(alert: &EmergencyAlert) -> Self {
        Self {
            alert_id: alert.id,
            status: alert.status,
            message_ref: alert.message_ref.clone(),
            reason: alert.reason,
            attempts: alert.attempts,
            timestamp: alert.created_at,
        }
    }
}
