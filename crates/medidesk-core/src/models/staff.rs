//! Staff (personnel) models.

use serde::{Deserialize, Serialize};

use super::{require_text, ValidationError};

/// Login of the protected seed administrator. Never listed.
pub const ADMIN_LOGIN: &str = "admin";

/// A staff account.
///
/// `password` carries a new plain-text password on writes only; reads never
/// populate it. The stored value is a salted hash (see [`crate::auth`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct Staff {
    #[serde(rename = "ID", default)]
    pub id: Option<i64>,
    /// Courtesy title (M., Mme, Dr.)
    #[serde(rename = "Mie", default)]
    pub title: Option<String>,
    #[serde(rename = "Nom", default)]
    pub last_name: Option<String>,
    #[serde(rename = "Prenom", default)]
    pub first_name: Option<String>,
    #[serde(rename = "Tel", default)]
    pub phone: Option<String>,
    #[serde(rename = "Mail", default)]
    pub email: Option<String>,
    #[serde(rename = "Adresse", default)]
    pub address: Option<String>,
    #[serde(rename = "Photo_FileName", default)]
    pub photo_file_name: Option<String>,
    #[serde(rename = "Photo_FileType", default)]
    pub photo_file_type: Option<String>,
    /// Role (doctor, secretary, finance, ...)
    #[serde(rename = "Type", default)]
    pub role: Option<String>,
    #[serde(rename = "Specialite", default)]
    pub specialty: Option<String>,
    #[serde(rename = "Login")]
    pub login: String,
    #[serde(rename = "MotPasse", default, skip_serializing)]
    pub password: Option<String>,
    #[serde(rename = "DateEntree", default)]
    pub entry_date: Option<String>,
    /// Permission level
    #[serde(rename = "Droit", default)]
    pub permission: Option<String>,
    #[serde(rename = "CIN", default)]
    pub cin: Option<String>,
    /// Successful logins
    #[serde(rename = "NbreEntree", default)]
    pub login_count: i64,
}

impl Staff {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    /// "Nom Prenom", used in audit messages.
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.last_name.as_deref().unwrap_or_default(),
            self.first_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }

    pub fn is_admin(&self) -> bool {
        self.login == ADMIN_LOGIN
    }

    /// New accounts need a login and a password.
    pub fn validate_new(&self) -> Result<(), ValidationError> {
        require_text("Login", &self.login)?;
        require_text("MotPasse", self.password.as_deref().unwrap_or_default())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_never_serialized() {
        let staff = Staff::new("dr.x", "secret");
        let json = serde_json::to_string(&staff).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("MotPasse"));
        assert!(json.contains(r#""Login":"dr.x""#));
    }

    #[test]
    fn test_validate_new_requires_password() {
        let mut staff = Staff::new("dr.x", "");
        assert_eq!(
            staff.validate_new(),
            Err(ValidationError::MissingField("MotPasse"))
        );
        staff.password = Some("pw".into());
        assert!(staff.validate_new().is_ok());
    }
}
