//! Audit log entries.

use serde::{Deserialize, Serialize};

use super::{require_text, ValidationError};

/// One append-only audit entry: who did what, when.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct AuditEntry {
    #[serde(rename = "IDDate", default)]
    pub id: Option<i64>,
    /// RFC 3339 timestamp; filled with the current time when absent
    #[serde(rename = "Date_E", default)]
    pub timestamp: Option<String>,
    /// Acting staff member
    #[serde(rename = "Mat", default)]
    pub staff_id: Option<i64>,
    #[serde(rename = "Action")]
    pub action: String,
}

impl AuditEntry {
    pub fn new(staff_id: Option<i64>, action: impl Into<String>) -> Self {
        Self {
            staff_id,
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("Action", &self.action)
    }
}
