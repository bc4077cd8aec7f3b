pub mod encryption;
pub mod keys;
mod phi_audit;

pub use encryption::*;
pub use keys::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed — wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Vault key unavailable — expected key material at {0}")]
    KeyUnavailable(String),

    #[error("Vault key already exists at {0} — refusing to overwrite")]
    KeyExists(String),

    #[error("Corrupted ciphertext")]
    CorruptedCiphertext,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
