//! Application configuration and path resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::RetryPolicy;

/// Application-level constants
pub const APP_NAME: &str = "Medidesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the install directory.
pub const HOME_ENV: &str = "MEDIDESK_HOME";

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 100_000;

/// Password given to the seed administrator on a fresh database.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

/// Runtime configuration for a clinic database and its asset directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicConfig {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Directory holding photos and attachments
    pub assets_dir: PathBuf,
    /// SQLite busy timeout, in milliseconds
    pub busy_timeout_ms: u64,
    /// Retry applied to every write on SQLITE_BUSY / SQLITE_LOCKED
    pub retry: RetryPolicy,
    /// PBKDF2 iterations for new password hashes
    pub password_iterations: u32,
    /// Initial password of the seed administrator
    pub seed_admin_password: String,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self::with_root(install_dir())
    }
}

impl ClinicConfig {
    /// Layout under `root`: `db/clinic.db` and `assets/`.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            db_path: root.join("db").join("clinic.db"),
            assets_dir: root.join("assets"),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            retry: RetryPolicy::default(),
            password_iterations: DEFAULT_PASSWORD_ITERATIONS,
            seed_admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }

    /// Resolve from `MEDIDESK_HOME`, falling back to the executable's directory.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create the database and asset directories if missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.assets_dir)
    }
}

/// Directory the application is installed in.
pub fn install_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(home);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,medidesk_core=debug"
}
