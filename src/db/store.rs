use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use super::repository;
use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;
use crate::models::{
    AlertFilter, DeliveryStatus, EmergencyAlert, EmergencyContact, ReasonCode,
    StoredTransportConfig,
};

/// Handle over the alert database. A single connection guarded by a mutex:
/// concurrent sends serialize their appends, so no record is partially
/// written or lost under interleaving.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_database(path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database()?),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        f(&conn)
    }

    // ── Audit log ────────────────────────────────────────────────────────

    pub fn append_alert(&self, alert: &EmergencyAlert) -> Result<Uuid, DatabaseError> {
        self.with_conn(|conn| repository::insert_alert(conn, alert))?;
        Ok(alert.id)
    }

    pub fn get_alert(&self, id: &Uuid) -> Result<EmergencyAlert, DatabaseError> {
        self.with_conn(|conn| repository::get_alert(conn, id))
    }

    pub fn query_alerts(&self, filter: &AlertFilter) -> Result<Vec<EmergencyAlert>, DatabaseError> {
        self.with_conn(|conn| repository::query_alerts(conn, filter))
    }

    pub fn update_alert_status(
        &self,
        id: &Uuid,
        status: DeliveryStatus,
        reason: Option<ReasonCode>,
    ) -> Result<bool, DatabaseError> {
        self.with_conn(|conn| repository::update_alert_status(conn, id, status, reason))
    }

    pub fn purge_older_than(&self, retention_days: i64) -> Result<usize, DatabaseError> {
        self.with_conn(|conn| repository::purge_older_than(conn, retention_days))
    }

    // ── Contacts ─────────────────────────────────────────────────────────

    pub fn add_contact(
        &self,
        name: &str,
        phone: &str,
        priority: i64,
    ) -> Result<EmergencyContact, DatabaseError> {
        self.with_conn(|conn| repository::insert_contact(conn, name, phone, priority))
    }

    pub fn contacts(&self, active_only: bool) -> Result<Vec<EmergencyContact>, DatabaseError> {
        self.with_conn(|conn| repository::list_contacts(conn, active_only))
    }

    pub fn deactivate_contact(&self, id: &Uuid) -> Result<bool, DatabaseError> {
        self.with_conn(|conn| repository::deactivate_contact(conn, id))
    }

    // ── Transport configuration ──────────────────────────────────────────

    pub fn save_transport_config(
        &self,
        config: &StoredTransportConfig,
    ) -> Result<(), DatabaseError> {
        self.with_conn(|conn| repository::save_transport_config(conn, config))
    }

    pub fn load_transport_config(&self) -> Result<Option<StoredTransportConfig>, DatabaseError> {
        self.with_conn(repository::load_transport_config)
    }

    pub fn mark_tested(&self, tested_at: NaiveDateTime) -> Result<(), DatabaseError> {
        self.with_conn(|conn| repository::mark_tested(conn, tested_at))
    }

    pub fn has_stored_secret(&self) -> Result<bool, DatabaseError> {
        self.with_conn(repository::has_stored_secret)
    }
}
