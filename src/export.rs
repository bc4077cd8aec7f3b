//! Audit history export. Two formats: CSV (the tabular text floor the
//! compliance workflow expects) and JSON for programmatic consumers.

use std::fmt::Write as _;

use crate::db::DatabaseError;
use crate::models::{EmergencyAlert, ExportFormat};

const CSV_HEADER: &str =
    "id,created_at,case_reference,urgency,status,recipient,attempts,reason,message_ref,message";

/// Render alert records into an export byte stream. Records are emitted in
/// the order given (queries already return most recent first).
pub fn export_alerts(
    alerts: &[EmergencyAlert],
    format: ExportFormat,
) -> Result<Vec<u8>, DatabaseError> {
    match format {
        ExportFormat::Csv => Ok(to_csv(alerts).into_bytes()),
        ExportFormat::Json => serde_json::to_vec_pretty(alerts)
            .map_err(|e| DatabaseError::ConstraintViolation(format!("JSON export failed: {e}"))),
    }
}

fn to_csv(alerts: &[EmergencyAlert]) -> String {
    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push('\n');

    for alert in alerts {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            alert.id,
            alert.created_at.format("%Y-%m-%d %H:%M:%S"),
            csv_field(&alert.case_reference),
            alert.urgency.as_str(),
            alert.status.as_str(),
            csv_field(&alert.recipient),
            alert.attempts,
            alert.reason.map(|r| r.as_str()).unwrap_or(""),
            csv_field(alert.message_ref.as_deref().unwrap_or("")),
            csv_field(&alert.message),
        );
    }
    out
}

/// Quote a field when it contains separators, quotes or newlines
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeliveryStatus, Gender, RedactedSnapshot, UrgencyLevel};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn alert(message: &str) -> EmergencyAlert {
        EmergencyAlert {
            id: Uuid::new_v4(),
            created_at: NaiveDate::from_ymd_opt(2026, 8, 1)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
            case_reference: "C-42".into(),
            urgency: UrgencyLevel::Critical,
            message: message.into(),
            recipient: "+15550101".into(),
            status: DeliveryStatus::Sent,
            message_ref: Some("SM123".into()),
            reason: None,
            attempts: 1,
            notes: String::new(),
            context: RedactedSnapshot {
                age: 7,
                gender: Gender::Female.code().to_string(),
                diagnosis: None,
                confidence: None,
                symptoms: vec![],
            },
        }
    }

    #[test]
    fn csv_has_header_and_one_line_per_record() {
        let alerts = vec![alert("plain message"), alert("another")];
        let bytes = export_alerts(&alerts, ExportFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER);
        assert!(lines[1].contains("C-42"));
        assert!(lines[1].contains("2026-08-01 10:30:00"));
    }

    #[test]
    fn csv_escapes_separators_and_quotes() {
        let alerts = vec![alert(r#"URGENT | Case C-42 | seizures, hypotonia | "note""#)];
        let bytes = export_alerts(&alerts, ExportFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains(r#""URGENT | Case C-42 | seizures, hypotonia | ""note""""#));
    }

    #[test]
    fn json_round_trips_through_serde() {
        let alerts = vec![alert("message one"), alert("message two")];
        let bytes = export_alerts(&alerts, ExportFormat::Json).unwrap();

        let parsed: Vec<EmergencyAlert> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].case_reference, "C-42");
        assert_eq!(parsed[0].status, DeliveryStatus::Sent);
    }

    #[test]
    fn empty_history_exports_header_only() {
        let bytes = export_alerts(&[], ExportFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.trim_end(), CSV_HEADER);
    }
}
