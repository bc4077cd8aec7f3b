use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::sqlite::DATETIME_FORMAT;
use crate::db::DatabaseError;
use crate::models::StoredTransportConfig;

/// Replace the single transport configuration row. The token must already be
/// encrypted; nothing here ever sees plaintext credentials. The row is
/// written whole — no partial updates.
pub fn save_transport_config(
    conn: &Connection,
    config: &StoredTransportConfig,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR REPLACE INTO transport_config
         (id, account_sid, encrypted_token, from_number, configured, last_tested)
         VALUES (1, ?1, ?2, ?3, ?4, ?5)",
        params![
            config.account_sid,
            config.encrypted_token,
            config.from_number,
            config.configured as i32,
            config
                .last_tested
                .map(|t| t.format(DATETIME_FORMAT).to_string()),
        ],
    )?;
    Ok(())
}

/// Load the active transport configuration, if one has been saved.
pub fn load_transport_config(
    conn: &Connection,
) -> Result<Option<StoredTransportConfig>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT account_sid, encrypted_token, from_number, configured, last_tested
             FROM transport_config WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((account_sid, encrypted_token, from_number, configured, last_tested)) = row else {
        return Ok(None);
    };

    let last_tested = last_tested
        .map(|t| {
            NaiveDateTime::parse_from_str(&t, DATETIME_FORMAT)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
        })
        .transpose()?;

    Ok(Some(StoredTransportConfig {
        account_sid,
        encrypted_token,
        from_number,
        configured: configured != 0,
        last_tested,
    }))
}

/// Record a successful connectivity test.
pub fn mark_tested(conn: &Connection, tested_at: NaiveDateTime) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE transport_config SET last_tested = ?1 WHERE id = 1",
        params![tested_at.format(DATETIME_FORMAT).to_string()],
    )?;
    Ok(())
}

/// Whether encrypted credential material already exists. Drives the loud
/// missing-key failure at startup: a present secret with an absent key means
/// data loss, not first run.
pub fn has_stored_secret(conn: &Connection) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transport_config WHERE encrypted_token != ''",
        [],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::Utc;

    fn config() -> StoredTransportConfig {
        StoredTransportConfig {
            account_sid: "AC0123456789".into(),
            encrypted_token: "bm9uY2UrY2lwaGVydGV4dA==".into(),
            from_number: "+15550100".into(),
            configured: true,
            last_tested: None,
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let conn = open_memory_database().unwrap();
        save_transport_config(&conn, &config()).unwrap();

        let loaded = load_transport_config(&conn).unwrap().unwrap();
        assert_eq!(loaded.account_sid, "AC0123456789");
        assert_eq!(loaded.from_number, "+15550100");
        assert!(loaded.configured);
        assert!(loaded.last_tested.is_none());
    }

    #[test]
    fn load_before_save_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(load_transport_config(&conn).unwrap().is_none());
        assert!(!has_stored_secret(&conn).unwrap());
    }

    #[test]
    fn save_replaces_the_single_row() {
        let conn = open_memory_database().unwrap();
        save_transport_config(&conn, &config()).unwrap();

        let mut updated = config();
        updated.account_sid = "AC_NEW".into();
        save_transport_config(&conn, &updated).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM transport_config", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            load_transport_config(&conn).unwrap().unwrap().account_sid,
            "AC_NEW"
        );
    }

    #[test]
    fn mark_tested_sets_timestamp() {
        let conn = open_memory_database().unwrap();
        save_transport_config(&conn, &config()).unwrap();

        let now = Utc::now().naive_utc();
        mark_tested(&conn, now).unwrap();

        let loaded = load_transport_config(&conn).unwrap().unwrap();
        let recorded = loaded.last_tested.unwrap();
        assert_eq!(
            recorded.format(DATETIME_FORMAT).to_string(),
            now.format(DATETIME_FORMAT).to_string()
        );
    }

    #[test]
    fn stored_secret_detected() {
        let conn = open_memory_database().unwrap();
        save_transport_config(&conn, &config()).unwrap();
        assert!(has_stored_secret(&conn).unwrap());
    }
}
