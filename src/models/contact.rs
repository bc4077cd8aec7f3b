use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A designated alert recipient. Contacts referenced by historical alerts
/// are deactivated, never physically deleted, to preserve audit integrity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub id: Uuid,
    pub name: String,
    /// E.164-normalized, unique among active contacts
    pub phone: String,
    /// Lower rank is contacted first
    pub priority: i64,
    pub active: bool,
    pub created_at: NaiveDateTime,
}
