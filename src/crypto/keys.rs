use std::path::{Path, PathBuf};

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use super::encryption::EncryptedData;
use super::CryptoError;
use crate::config::VAULT_SECRET_ENV;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const KEY_LENGTH: usize = 32; // AES-256
pub const SALT_LENGTH: usize = 32;

const KEY_FILE: &str = "vault.key";
const SALT_FILE: &str = "vault.salt";

/// Where the active key came from. Environment-sourced keys are derived from
/// a deployment secret and take precedence over the local key file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Generated,
    Environment,
}

/// Vault encryption key — zeroed on drop
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct VaultKey {
    pub(super) key_bytes: [u8; KEY_LENGTH],
    #[zeroize(skip)]
    source: KeySource,
}

impl VaultKey {
    /// Load the key for this deployment.
    ///
    /// Preference order: a secret in `ALERTLINE_VAULT_SECRET` (derived via
    /// PBKDF2-SHA256 with a salt persisted next to the key file), then the
    /// locally generated key file. A missing key is a hard
    /// `CryptoError::KeyUnavailable` — regenerating here would silently orphan
    /// every existing ciphertext.
    pub fn load(keys_dir: &Path) -> Result<Self, CryptoError> {
        if let Ok(secret) = std::env::var(VAULT_SECRET_ENV) {
            if !secret.is_empty() {
                return Self::derive_from_secret(&secret, keys_dir);
            }
        }

        let key_path = key_path(keys_dir);
        if !key_path.exists() {
            return Err(CryptoError::KeyUnavailable(key_path.display().to_string()));
        }
        let mut bytes = std::fs::read(&key_path)?;
        if bytes.len() != KEY_LENGTH {
            bytes.zeroize();
            return Err(CryptoError::CorruptedCiphertext);
        }
        let mut key_bytes = [0u8; KEY_LENGTH];
        key_bytes.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self {
            key_bytes,
            source: KeySource::Generated,
        })
    }

    /// Generate and persist a fresh key. Fails if one already exists — key
    /// rotation is an explicit operator procedure, not an accident.
    pub fn generate(keys_dir: &Path) -> Result<Self, CryptoError> {
        let key_path = key_path(keys_dir);
        if key_path.exists() {
            return Err(CryptoError::KeyExists(key_path.display().to_string()));
        }
        std::fs::create_dir_all(keys_dir)?;

        use rand::RngCore;
        let mut key_bytes = [0u8; KEY_LENGTH];
        rand::thread_rng().fill_bytes(&mut key_bytes);

        std::fs::write(&key_path, key_bytes)?;
        restrict_permissions(&key_path)?;

        Ok(Self {
            key_bytes,
            source: KeySource::Generated,
        })
    }

    /// True when a generated key file is already present
    pub fn exists(keys_dir: &Path) -> bool {
        key_path(keys_dir).exists()
    }

    /// Derive a key from a deployment-provided secret. The salt is generated
    /// on first use and persisted so the derivation stays stable.
    fn derive_from_secret(secret: &str, keys_dir: &Path) -> Result<Self, CryptoError> {
        let salt = load_or_create_salt(keys_dir)?;
        let mut key_bytes = [0u8; KEY_LENGTH];
        pbkdf2_hmac::<Sha256>(secret.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut key_bytes);
        Ok(Self {
            key_bytes,
            source: KeySource::Environment,
        })
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    /// Encrypt data using AES-256-GCM
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<EncryptedData, CryptoError> {
        EncryptedData::encrypt(&self.key_bytes, plaintext)
    }

    /// Decrypt data using AES-256-GCM
    pub fn decrypt(&self, encrypted: &EncryptedData) -> Result<Vec<u8>, CryptoError> {
        encrypted.decrypt(&self.key_bytes)
    }
}

fn key_path(keys_dir: &Path) -> PathBuf {
    keys_dir.join(KEY_FILE)
}

fn load_or_create_salt(keys_dir: &Path) -> Result<[u8; SALT_LENGTH], CryptoError> {
    let salt_path = keys_dir.join(SALT_FILE);
    if salt_path.exists() {
        let bytes = std::fs::read(&salt_path)?;
        if bytes.len() != SALT_LENGTH {
            return Err(CryptoError::CorruptedCiphertext);
        }
        let mut salt = [0u8; SALT_LENGTH];
        salt.copy_from_slice(&bytes);
        return Ok(salt);
    }

    std::fs::create_dir_all(keys_dir)?;
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    std::fs::write(&salt_path, salt)?;
    Ok(salt)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), CryptoError> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o600);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), CryptoError> {
    Ok(())
}
