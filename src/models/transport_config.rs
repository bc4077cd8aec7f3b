use chrono::NaiveDateTime;
use serde::Serialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Transport configuration as persisted: the auth token only ever exists
/// here in its encrypted form (base64 of nonce+ciphertext).
#[derive(Debug, Clone)]
pub struct StoredTransportConfig {
    pub account_sid: String,
    /// Base64-encoded AES-GCM blob — never plaintext
    pub encrypted_token: String,
    pub from_number: String,
    pub configured: bool,
    pub last_tested: Option<NaiveDateTime>,
}

/// Decrypted credentials, alive only for the duration of a transport call.
/// Zeroized on drop; deliberately not `Debug`, `Serialize` or loggable.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TransportCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Operator-visible view of the transport configuration. Carries no secret
/// material in any form.
#[derive(Debug, Clone, Serialize)]
pub struct TransportStatus {
    pub account_sid: String,
    pub from_number: String,
    pub configured: bool,
    pub last_tested: Option<NaiveDateTime>,
}

impl From<&StoredTransportConfig> for TransportStatus {
    fn from(cfg: &StoredTransportConfig) -> Self {
        Self {
            account_sid: cfg.account_sid.clone(),
            from_number: cfg.from_number.clone(),
            configured: cfg.configured,
            last_tested: cfg.last_tested,
        }
    }
}
