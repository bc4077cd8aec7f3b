use chrono::NaiveDateTime;

use super::enums::{DeliveryStatus, UrgencyLevel};

/// Filter for audit history queries. All fields optional, combined with
/// logical AND. Results are ordered most recent first.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
    pub urgency: Option<UrgencyLevel>,
    pub status: Option<DeliveryStatus>,
}
