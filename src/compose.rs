//! Message composition: (patient context, urgency, notes) -> bounded SMS text.
//!
//! Pure and deterministic — identical inputs always yield byte-identical
//! output, which is what makes retries idempotent and the composer testable
//! in isolation. No timestamps, no randomness, no I/O.

use crate::models::{PatientContext, UrgencyLevel};

/// Single-segment SMS limit the transport guarantees
pub const SMS_CHAR_LIMIT: usize = 160;

/// At most this many symptom names are included, in the order supplied
pub const MAX_SYMPTOMS: usize = 3;

/// Clinician notes are a fixed-width field in the message
pub const MAX_NOTES_LEN: usize = 50;

const URGENT_MARKER: &str = "URGENT";
const CALLBACK: &str = "Call back immediately";
const SEPARATOR: &str = " | ";

/// Compose the alert text. Segments are assembled in priority order and,
/// when the result would exceed the transport limit, dropped lowest-priority
/// first: notes, then symptoms beyond the first, then the confidence detail,
/// then the diagnosis name. The case reference, the urgency marker and at
/// least one symptom (when any were supplied) always survive. Fields are
/// dropped whole, never cut mid-field.
pub fn compose(context: &PatientContext, urgency: UrgencyLevel, notes: &str) -> String {
    let clipped_notes = clip(notes.trim(), MAX_NOTES_LEN);
    let mut include_notes = !clipped_notes.is_empty();
    let mut symptom_count = context.symptoms.len().min(MAX_SYMPTOMS);
    let mut include_confidence = context.top_diagnosis.is_some();
    let mut include_diagnosis = context.top_diagnosis.is_some();

    loop {
        let text = render(
            context,
            urgency,
            &clipped_notes,
            include_notes,
            symptom_count,
            include_diagnosis,
            include_confidence,
        );
        if text.chars().count() <= SMS_CHAR_LIMIT {
            return text;
        }
        if include_notes {
            include_notes = false;
            continue;
        }
        if symptom_count > 1 {
            symptom_count -= 1;
            continue;
        }
        if include_confidence {
            include_confidence = false;
            continue;
        }
        if include_diagnosis {
            include_diagnosis = false;
            continue;
        }
        // Only reachable with a pathologically long case reference; cut at a
        // character boundary so the transport limit still holds.
        return text.chars().take(SMS_CHAR_LIMIT).collect();
    }
}

fn render(
    context: &PatientContext,
    urgency: UrgencyLevel,
    notes: &str,
    include_notes: bool,
    symptom_count: usize,
    include_diagnosis: bool,
    include_confidence: bool,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    if urgency.is_highest() {
        parts.push(URGENT_MARKER.to_string());
    }

    parts.push(format!("Case {}", context.case_reference));
    parts.push(format!("{}y {}", context.age, context.gender.code()));

    if include_diagnosis {
        if let Some(diag) = &context.top_diagnosis {
            if include_confidence {
                parts.push(format!("{} ({}%)", diag.name, percent(diag.confidence)));
            } else {
                parts.push(diag.name.clone());
            }
        }
    }

    if symptom_count > 0 {
        let symptoms: Vec<&str> = context
            .symptoms
            .iter()
            .take(symptom_count)
            .map(String::as_str)
            .collect();
        parts.push(symptoms.join(", "));
    }

    if include_notes {
        parts.push(format!("Notes: {notes}"));
    }

    if urgency.is_highest() {
        parts.push(CALLBACK.to_string());
    }

    parts.join(SEPARATOR)
}

fn percent(confidence: f32) -> u32 {
    (confidence * 100.0).round() as u32
}

fn clip(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Diagnosis, Gender};

    fn context() -> PatientContext {
        PatientContext {
            case_reference: "C-42".into(),
            age: 7,
            gender: Gender::Female,
            top_diagnosis: Some(Diagnosis {
                name: "Disorder X".into(),
                confidence: 0.82,
            }),
            symptoms: vec![
                "seizures".into(),
                "hypotonia".into(),
                "feeding difficulty".into(),
            ],
        }
    }

    #[test]
    fn critical_end_to_end_scenario() {
        let text = compose(&context(), UrgencyLevel::Critical, "");
        assert!(text.contains("URGENT"));
        assert!(text.contains("C-42"));
        assert!(text.contains("Disorder X"));
        assert!(text.contains("82%"));
        assert!(text.contains("seizures"));
        assert!(text.chars().count() <= SMS_CHAR_LIMIT);
    }

    #[test]
    fn composition_is_deterministic() {
        let a = compose(&context(), UrgencyLevel::Critical, "check ward 3");
        let b = compose(&context(), UrgencyLevel::Critical, "check ward 3");
        assert_eq!(a, b);
    }

    #[test]
    fn non_critical_has_no_urgent_marker() {
        for urgency in [UrgencyLevel::Low, UrgencyLevel::Medium, UrgencyLevel::High] {
            let text = compose(&context(), urgency, "");
            assert!(!text.contains(URGENT_MARKER));
            assert!(!text.contains(CALLBACK));
        }
    }

    #[test]
    fn critical_carries_callback_instruction() {
        let text = compose(&context(), UrgencyLevel::Critical, "");
        assert!(text.ends_with(CALLBACK));
    }

    #[test]
    fn at_most_three_symptoms_in_given_order() {
        let mut ctx = context();
        ctx.symptoms.push("microcephaly".into());
        let text = compose(&ctx, UrgencyLevel::Medium, "");
        assert!(text.contains("seizures, hypotonia, feeding difficulty"));
        assert!(!text.contains("microcephaly"));
    }

    #[test]
    fn notes_are_clipped_as_a_field() {
        let long_note = "x".repeat(200);
        let text = compose(&context(), UrgencyLevel::Low, &long_note);
        // The note never appears at full length even before tier-dropping
        assert!(!text.contains(&"x".repeat(MAX_NOTES_LEN + 1)));
    }

    #[test]
    fn overflow_drops_notes_before_symptoms() {
        let mut ctx = context();
        ctx.case_reference = "C-".to_string() + &"4".repeat(60);
        let note = "n".repeat(50);
        let text = compose(&ctx, UrgencyLevel::Critical, &note);
        assert!(text.chars().count() <= SMS_CHAR_LIMIT);
        assert!(!text.contains("Notes:"));
        // At least one symptom survives
        assert!(text.contains("seizures"));
    }

    #[test]
    fn overflow_drops_confidence_before_diagnosis_name() {
        let mut ctx = context();
        // Long enough to force dropping notes, extra symptoms, and the
        // confidence detail, but not the diagnosis name itself.
        ctx.case_reference = "C-".to_string() + &"4".repeat(88);
        let text = compose(&ctx, UrgencyLevel::Critical, "");
        assert!(text.chars().count() <= SMS_CHAR_LIMIT);
        assert!(text.contains("Disorder X"));
        assert!(!text.contains("%"));
        assert!(text.contains("URGENT"));
        assert!(text.contains("seizures"));
    }

    #[test]
    fn marker_case_and_symptom_survive_heavy_truncation() {
        let mut ctx = context();
        ctx.case_reference = "C-".to_string() + &"9".repeat(100);
        let text = compose(&ctx, UrgencyLevel::Critical, &"n".repeat(50));
        assert!(text.chars().count() <= SMS_CHAR_LIMIT);
        assert!(text.contains("URGENT"));
        assert!(text.contains(&ctx.case_reference));
        assert!(text.contains("seizures"));
    }

    #[test]
    fn no_diagnosis_is_fine() {
        let mut ctx = context();
        ctx.top_diagnosis = None;
        let text = compose(&ctx, UrgencyLevel::High, "");
        assert!(text.contains("C-42"));
        assert!(!text.contains("%"));
    }

    #[test]
    fn no_symptoms_is_fine() {
        let mut ctx = context();
        ctx.symptoms.clear();
        let text = compose(&ctx, UrgencyLevel::Low, "");
        assert!(text.contains("7y F"));
    }

    #[test]
    fn confidence_rounds_to_whole_percent() {
        let mut ctx = context();
        ctx.top_diagnosis = Some(Diagnosis {
            name: "Disorder Y".into(),
            confidence: 0.955,
        });
        let text = compose(&ctx, UrgencyLevel::Low, "");
        assert!(text.contains("(96%)"));
    }
}
