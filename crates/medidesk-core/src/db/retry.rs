//! Bounded retry for writes that hit a busy or locked database.

use std::time::Duration;

use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};

use super::{DbError, DbResult};

/// Linear backoff retry: after the n-th failure wait `backoff_step_ms * n`.
///
/// Only `SQLITE_BUSY` and `SQLITE_LOCKED` are retried; any other error is
/// returned on first occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub backoff_step_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_step_ms: 100,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_step_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_step_ms.saturating_mul(attempt as u64))
    }

    /// Run `f`, retrying while it fails with a busy/locked error.
    pub fn run<T, F>(&self, op: &str, mut f: F) -> DbResult<T>
    where
        F: FnMut() -> DbResult<T>,
    {
        let mut retries = 0;
        loop {
            match f() {
                Err(e) if e.is_busy() && retries < self.max_retries => {
                    retries += 1;
                    let delay = self.backoff(retries);
                    tracing::warn!(
                        op,
                        attempt = retries,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Database busy, retrying"
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => {
                    if e.is_busy() {
                        tracing::error!(op, retries, error = %e, "Database still busy, giving up");
                    }
                    return Err(e);
                }
                Ok(value) => return Ok(value),
            }
        }
    }
}

/// Whether a SQLite error is transient lock contention.
pub fn is_busy_error(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked)
    )
}

impl DbError {
    pub fn is_busy(&self) -> bool {
        match self {
            DbError::Sqlite(e) => is_busy_error(e),
            _ => false,
        }
    }
}
