use serde::{Deserialize, Serialize};

use super::enums::Gender;

/// Snapshot of the diagnostic session handed to the alert subsystem by the
/// host application. This is the whole boundary with the diagnosis/UI layer:
/// the core never sees model internals or screen state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientContext {
    /// Opaque case identifier — never the patient's real name
    pub case_reference: String,
    pub age: u16,
    pub gender: Gender,
    /// Highest-confidence prediction, when the model produced one
    pub top_diagnosis: Option<Diagnosis>,
    /// Symptom names in the order the host supplied them
    pub symptoms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub name: String,
    /// Confidence in [0.0, 1.0]
    pub confidence: f32,
}

impl PatientContext {
    /// Validate at the collaborator boundary, before anything enters the core.
    /// Returns a human-explainable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.case_reference.trim().is_empty() {
            return Err("case reference must not be empty".into());
        }
        if let Some(diag) = &self.top_diagnosis {
            if diag.name.trim().is_empty() {
                return Err("diagnosis name must not be empty".into());
            }
            if !(0.0..=1.0).contains(&diag.confidence) {
                return Err(format!(
                    "diagnosis confidence {} outside [0, 1]",
                    diag.confidence
                ));
            }
        }
        Ok(())
    }

    /// Redacted snapshot stored with the audit record. Only fields the
    /// anonymization policy permits: opaque case reference, age, gender code,
    /// top diagnosis, and at most the first three symptom names.
    pub fn redacted_snapshot(&self) -> RedactedSnapshot {
        RedactedSnapshot {
            age: self.age,
            gender: self.gender.code().to_string(),
            diagnosis: self.top_diagnosis.as_ref().map(|d| d.name.clone()),
            confidence: self.top_diagnosis.as_ref().map(|d| d.confidence),
            symptoms: self.symptoms.iter().take(3).cloned().collect(),
        }
    }
}

/// The audited subset of a patient context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedSnapshot {
    pub age: u16,
    pub gender: String,
    pub diagnosis: Option<String>,
    pub confidence: Option<f32>,
    pub symptoms: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

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
                "microcephaly".into(),
            ],
        }
    }

    #[test]
    fn valid_context_passes() {
        assert!(context().validate().is_ok());
    }

    #[test]
    fn empty_case_reference_rejected() {
        let mut ctx = context();
        ctx.case_reference = "  ".into();
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn confidence_out_of_range_rejected() {
        let mut ctx = context();
        ctx.top_diagnosis.as_mut().unwrap().confidence = 1.2;
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn snapshot_caps_symptoms_at_three() {
        let snap = context().redacted_snapshot();
        assert_eq!(snap.symptoms.len(), 3);
        assert_eq!(snap.symptoms[0], "seizures");
    }

    #[test]
    fn snapshot_carries_no_case_free_text() {
        let snap = context().redacted_snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        assert!(!json.contains("case_reference"));
        assert!(json.contains("\"gender\":\"F\""));
    }
}
