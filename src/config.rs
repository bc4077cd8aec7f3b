use std::path::{Path, PathBuf};

/// Library-level constants
pub const APP_NAME: &str = "Alertline";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding a deployment-provided vault secret.
/// When set, the vault key is derived from it instead of the key file.
pub const VAULT_SECRET_ENV: &str = "ALERTLINE_VAULT_SECRET";

/// Default audit retention window in days
pub const DEFAULT_RETENTION_DAYS: i64 = 90;

/// Get the default data directory for an embedding application that
/// does not supply its own: `<platform data dir>/alertline`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("alertline")
}

/// Filesystem layout for one deployment: where the alert database and the
/// vault key material live. Key material sits in its own directory so a
/// backup of the database never carries the key alongside the ciphertext.
#[derive(Debug, Clone)]
pub struct ServicePaths {
    pub data_dir: PathBuf,
}

impl ServicePaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// SQLite database holding alerts, contacts and transport config
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("alerts.db")
    }

    /// Directory holding vault key material (`vault.key` / `vault.salt`)
    pub fn keys_dir(&self) -> PathBuf {
        self.data_dir.join("keys")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for ServicePaths {
    fn default() -> Self {
        Self::new(default_data_dir())
    }
}

/// Default tracing filter when RUST_LOG is not set
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}
