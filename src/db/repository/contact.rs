use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::sqlite::DATETIME_FORMAT;
use crate::db::DatabaseError;
use crate::models::EmergencyContact;

/// Insert a contact. The phone must already be E.164-normalized; uniqueness
/// among active contacts is enforced by a partial unique index.
pub fn insert_contact(
    conn: &Connection,
    name: &str,
    phone: &str,
    priority: i64,
) -> Result<EmergencyContact, DatabaseError> {
    let contact = EmergencyContact {
        id: Uuid::new_v4(),
        name: name.to_string(),
        phone: phone.to_string(),
        priority,
        active: true,
        created_at: Utc::now().naive_utc(),
    };

    conn.execute(
        "INSERT INTO contacts (id, name, phone, priority, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            contact.id.to_string(),
            contact.name,
            contact.phone,
            contact.priority,
            contact.active as i32,
            contact.created_at.format(DATETIME_FORMAT).to_string(),
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DatabaseError::ConstraintViolation(
                "an active contact with this phone number already exists".into(),
            )
        }
        other => other.into(),
    })?;

    Ok(contact)
}

/// List contacts ordered by priority rank (lower first), then creation time.
pub fn list_contacts(
    conn: &Connection,
    active_only: bool,
) -> Result<Vec<EmergencyContact>, DatabaseError> {
    let sql = if active_only {
        "SELECT id, name, phone, priority, active, created_at FROM contacts
         WHERE active = 1 ORDER BY priority ASC, created_at ASC"
    } else {
        "SELECT id, name, phone, priority, active, created_at FROM contacts
         ORDER BY priority ASC, created_at ASC"
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], map_contact_row)?;

    let mut contacts = Vec::new();
    for row in rows {
        contacts.push(row??);
    }
    Ok(contacts)
}

/// Deactivate a contact. Historical alerts keep referencing its number, so
/// rows are never physically deleted. Returns false when the id is unknown.
pub fn deactivate_contact(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE contacts SET active = 0 WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(updated == 1)
}

fn map_contact_row(row: &Row<'_>) -> rusqlite::Result<Result<EmergencyContact, DatabaseError>> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let phone: String = row.get(2)?;
    let priority: i64 = row.get(3)?;
    let active: i32 = row.get(4)?;
    let created_at: String = row.get(5)?;

    Ok((|| {
        Ok(EmergencyContact {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            name,
            phone,
            priority,
            active: active != 0,
            created_at: NaiveDateTime::parse_from_str(&created_at, DATETIME_FORMAT)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        })
    })())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn insert_and_list() {
        let conn = open_memory_database().unwrap();
        insert_contact(&conn, "On-call A", "+15550100", 2).unwrap();
        insert_contact(&conn, "On-call B", "+15550101", 1).unwrap();

        let contacts = list_contacts(&conn, true).unwrap();
        assert_eq!(contacts.len(), 2);
        // Lower rank first
        assert_eq!(contacts[0].name, "On-call B");
        assert_eq!(contacts[1].name, "On-call A");
    }

    #[test]
    fn duplicate_active_phone_rejected() {
        let conn = open_memory_database().unwrap();
        insert_contact(&conn, "A", "+15550100", 1).unwrap();
        let dup = insert_contact(&conn, "B", "+15550100", 2);
        assert!(matches!(dup, Err(DatabaseError::ConstraintViolation(_))));
    }

    #[test]
    fn deactivated_number_can_be_reused() {
        let conn = open_memory_database().unwrap();
        let first = insert_contact(&conn, "A", "+15550100", 1).unwrap();
        assert!(deactivate_contact(&conn, &first.id).unwrap());

        // Same number, new active contact — allowed once the old one is inactive
        insert_contact(&conn, "A again", "+15550100", 1).unwrap();

        let active = list_contacts(&conn, true).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "A again");

        // The deactivated row survives for audit integrity
        let all = list_contacts(&conn, false).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn deactivate_unknown_contact_reports_false() {
        let conn = open_memory_database().unwrap();
        assert!(!deactivate_contact(&conn, &Uuid::new_v4()).unwrap());
    }
}
