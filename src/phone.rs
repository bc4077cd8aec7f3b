use std::sync::OnceLock;

use regex::Regex;

/// E.164: leading `+`, then 8-15 digits, first digit non-zero.
fn e164() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+[1-9]\d{7,14}$").unwrap())
}

/// Strip formatting punctuation and normalize to E.164. Accepts numbers
/// already carrying a `+` country prefix as well as human-formatted input
/// like `"+1 (555) 010-4477"`. Returns `None` when the result is not a
/// plausible E.164 number — callers surface that as a validation failure.
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    let candidate = if has_plus {
        format!("+{digits}")
    } else if digits.len() >= 11 {
        // Country code already present, just missing the plus
        format!("+{digits}")
    } else {
        return None;
    };

    e164().is_match(&candidate).then_some(candidate)
}

/// Whether the string is already a valid E.164 number
pub fn is_valid(phone: &str) -> bool {
    e164().is_match(phone)
}
