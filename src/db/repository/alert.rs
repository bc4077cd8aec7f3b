use std::str::FromStr;

use chrono::{NaiveDateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

use crate::db::sqlite::DATETIME_FORMAT;
use crate::db::DatabaseError;
use crate::models::{
    AlertFilter, DeliveryStatus, EmergencyAlert, RedactedSnapshot, ReasonCode, UrgencyLevel,
};

/// Append one alert record. This is the only way rows enter the table.
pub fn insert_alert(conn: &Connection, alert: &EmergencyAlert) -> Result<(), DatabaseError> {
    let context_json = serde_json::to_string(&alert.context)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid context snapshot: {e}")))?;

    conn.execute(
        "INSERT INTO alerts
         (id, created_at, case_reference, urgency, message, recipient,
          status, message_ref, reason, attempts, notes, context_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            alert.id.to_string(),
            alert.created_at.format(DATETIME_FORMAT).to_string(),
            alert.case_reference,
            alert.urgency.as_str(),
            alert.message,
            alert.recipient,
            alert.status.as_str(),
            alert.message_ref,
            alert.reason.map(|r| r.as_str()),
            alert.attempts,
            alert.notes,
            context_json,
        ],
    )?;
    Ok(())
}

/// Load one alert by id.
pub fn get_alert(conn: &Connection, id: &Uuid) -> Result<EmergencyAlert, DatabaseError> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
    stmt.query_row(params![id.to_string()], map_alert_row)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "alert".into(),
                id: id.to_string(),
            },
            other => other.into(),
        })?
}

/// Query alerts with optional date-range / urgency / status filters,
/// AND-combined, most recent first.
pub fn query_alerts(
    conn: &Connection,
    filter: &AlertFilter,
) -> Result<Vec<EmergencyAlert>, DatabaseError> {
    let mut conditions: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(from) = filter.date_from {
        conditions.push("created_at >= ?");
        values.push(Value::Text(from.format(DATETIME_FORMAT).to_string()));
    }
    if let Some(to) = filter.date_to {
        conditions.push("created_at <= ?");
        values.push(Value::Text(to.format(DATETIME_FORMAT).to_string()));
    }
    if let Some(urgency) = filter.urgency {
        conditions.push("urgency = ?");
        values.push(Value::Text(urgency.as_str().to_string()));
    }
    if let Some(status) = filter.status {
        conditions.push("status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    let sql = format!("{SELECT_COLUMNS}{where_clause} ORDER BY created_at DESC, id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), map_alert_row)?;

    let mut alerts = Vec::new();
    for row in rows {
        alerts.push(row??);
    }
    Ok(alerts)
}

/// Atomically refine the status of one alert (`Sent -> Delivered/Undelivered`).
/// A single UPDATE keyed by id — never a duplicate row. Returns false when no
/// record with that id exists.
pub fn update_alert_status(
    conn: &Connection,
    id: &Uuid,
    status: DeliveryStatus,
    reason: Option<ReasonCode>,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE alerts SET status = ?1, reason = COALESCE(?2, reason) WHERE id = ?3",
        params![status.as_str(), reason.map(|r| r.as_str()), id.to_string()],
    )?;
    Ok(updated == 1)
}

/// Remove records strictly older than the retention cutoff (records
/// timestamped exactly at the cutoff are retained). Returns the count removed.
pub fn purge_older_than(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let cutoff = Utc::now().naive_utc() - chrono::Duration::days(retention_days);
    purge_before(conn, cutoff)
}

/// Purge with an explicit cutoff instant (exclusive). Split out so the
/// boundary behavior is testable without clock control.
pub fn purge_before(conn: &Connection, cutoff: NaiveDateTime) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM alerts WHERE created_at < ?1",
        params![cutoff.format(DATETIME_FORMAT).to_string()],
    )?;
    Ok(deleted)
}

const SELECT_COLUMNS: &str = "SELECT id, created_at, case_reference, urgency, message, recipient,
        status, message_ref, reason, attempts, notes, context_json FROM alerts";

fn map_alert_row(row: &Row<'_>) -> rusqlite::Result<Result<EmergencyAlert, DatabaseError>> {
    let id: String = row.get(0)?;
    let created_at: String = row.get(1)?;
    let case_reference: String = row.get(2)?;
    let urgency: String = row.get(3)?;
    let message: String = row.get(4)?;
    let recipient: String = row.get(5)?;
    let status: String = row.get(6)?;
    let message_ref: Option<String> = row.get(7)?;
    let reason: Option<String> = row.get(8)?;
    let attempts: u32 = row.get(9)?;
    let notes: String = row.get(10)?;
    let context_json: String = row.get(11)?;

    Ok(build_alert(
        id,
        created_at,
        case_reference,
        urgency,
        message,
        recipient,
        status,
        message_ref,
        reason,
        attempts,
        notes,
        context_json,
    ))
}

#[allow(clippy::too_many_arguments)]
fn build_alert(
    id: String,
    created_at: String,
    case_reference: String,
    urgency: String,
    message: String,
    recipient: String,
    status: String,
    message_ref: Option<String>,
    reason: Option<String>,
    attempts: u32,
    notes: String,
    context_json: String,
) -> Result<EmergencyAlert, DatabaseError> {
    let context: RedactedSnapshot = serde_json::from_str(&context_json)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("Invalid context snapshot: {e}")))?;

    Ok(EmergencyAlert {
        id: Uuid::parse_str(&id).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        created_at: NaiveDateTime::parse_from_str(&created_at, DATETIME_FORMAT)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        case_reference,
        urgency: UrgencyLevel::from_str(&urgency)?,
        message,
        recipient,
        status: DeliveryStatus::from_str(&status)?,
        message_ref,
        reason: reason.as_deref().map(ReasonCode::from_str).transpose()?,
        attempts,
        notes,
        context,
    })
}
