//! Installation settings loaded from `config.toml`.
//!
//! The file carries branding, the exit cutoff, plan limits, the employee id
//! scheme and the reference data seeded on startup. Every key has a default,
//! so an empty file is a valid configuration.

use crate::errors::{Error, Result};
use chrono::TimeDelta;
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Branding, time and limits
    #[serde(default)]
    pub app: AppSettings,
    /// How new employee identifiers are formatted
    #[serde(default)]
    pub employee_id: EmployeeIdScheme,
    /// Reference data to seed
    #[serde(default)]
    pub reference: ReferenceData,
    /// Outgoing mail transport
    #[serde(default)]
    pub mail: MailSettings,
}

/// Which transport delivers outgoing mail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Nothing is delivered; offers are saved with a delivery warning
    #[default]
    Disabled,
    /// Amazon SES v2 with the default AWS credential chain
    Ses,
}

/// `[mail]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub transport: MailTransport,
    /// SES region; the AWS default region when absent
    pub ses_region: Option<String>,
}

/// Application-wide settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Application name used in email subjects and signatures
    pub name: String,
    /// Company name substituted into offer letters
    pub company_name: String,
    /// Sender address for outgoing mail
    pub mail_from: String,
    /// Installation UTC offset in minutes; host local time when absent
    pub utc_offset_minutes: Option<i32>,
    /// Hour of the exit day after which access is revoked
    pub exit_cutoff_hour: u32,
    /// Upper bound for rendering an offer PDF
    pub pdf_timeout_secs: u64,
    /// Upper bound for handing a message to the mail transport
    pub mail_timeout_secs: u64,
    /// Plan limit on principals; unlimited when absent
    pub max_users: Option<u64>,
    /// Locale reported in the request context
    pub default_locale: String,
    /// Hours a sign-in stays valid
    pub session_ttl_hours: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "StaffDesk".to_string(),
            company_name: "StaffDesk".to_string(),
            mail_from: "no-reply@staffdesk.local".to_string(),
            utc_offset_minutes: None,
            exit_cutoff_hour: 18,
            pdf_timeout_secs: 30,
            mail_timeout_secs: 30,
            max_users: None,
            default_locale: "en".to_string(),
            session_ttl_hours: 12,
        }
    }
}

impl AppSettings {
    /// Session lifetime; an out-of-range setting means sessions never lapse.
    #[must_use]
    pub fn session_ttl(&self) -> TimeDelta {
        i64::try_from(self.session_ttl_hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .unwrap_or(TimeDelta::MAX)
    }
}

/// Employee id format: prefix followed by a zero-padded sequence number.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmployeeIdScheme {
    /// Leading text, e.g. `EMP`
    pub prefix: String,
    /// Minimum digit count of the sequence part
    pub width: usize,
}

impl Default for EmployeeIdScheme {
    fn default() -> Self {
        Self {
            prefix: "EMP".to_string(),
            width: 4,
        }
    }
}

impl EmployeeIdScheme {
    /// Formats sequence number `n` as an employee id.
    #[must_use]
    pub fn format(&self, n: u64) -> String {
        format!("{}{:0width$}", self.prefix, n, width = self.width)
    }
}

/// Reference data seeded idempotently by name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    pub branches: Vec<String>,
    pub departments: Vec<DepartmentSeed>,
    pub shifts: Vec<String>,
    pub attendance_policies: Vec<String>,
    pub sources: Vec<String>,
    pub document_types: Vec<String>,
    pub job_postings: Vec<JobPostingSeed>,
    pub offer_templates: Vec<OfferTemplateSeed>,
    pub roles: Vec<RoleSeed>,
}

/// A department and its designations.
#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentSeed {
    pub name: String,
    #[serde(default)]
    pub designations: Vec<String>,
}

/// A job posting, keyed by its code.
#[derive(Debug, Clone, Deserialize)]
pub struct JobPostingSeed {
    pub job_code: String,
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    /// Department name; must also be listed under `departments`
    #[serde(default)]
    pub department: Option<String>,
}

/// An offer letter template.
#[derive(Debug, Clone, Deserialize)]
pub struct OfferTemplateSeed {
    pub name: String,
    pub body: String,
}

/// A role and the permission strings it grants.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleSeed {
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading settings from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_settings(&contents)
}

/// Parses settings from TOML text.
pub fn parse_settings(contents: &str) -> Result<Settings> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from `STAFFDESK_CONFIG` (default `./config.toml`).
///
/// A missing file yields the defaults; a present but malformed file is an error.
pub fn load_default_settings() -> Result<Settings> {
    let path = std::env::var("STAFFDESK_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        load_settings(path)
    } else {
        tracing::warn!("No config file at {}, using defaults", path);
        Ok(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_settings() {
        let toml_str = r#"
            [app]
            name = "Acme HR"
            company_name = "Acme Ltd"
            utc_offset_minutes = 330
            max_users = 25

            [employee_id]
            prefix = "ACM-"
            width = 5

            [mail]
            transport = "ses"
            ses_region = "eu-west-1"

            [[reference.departments]]
            name = "Engineering"
            designations = ["Developer", "Lead"]

            [[reference.offer_templates]]
            name = "Standard"
            body = "Dear {candidate_name}"

            [[reference.roles]]
            name = "Recruiter"
            permissions = ["manage-candidates", "send-offers"]
        "#;

        let settings = parse_settings(toml_str).unwrap();
        assert_eq!(settings.app.name, "Acme HR");
        assert_eq!(settings.app.utc_offset_minutes, Some(330));
        assert_eq!(settings.app.exit_cutoff_hour, 18);
        assert_eq!(settings.app.max_users, Some(25));
        assert_eq!(settings.employee_id.format(7), "ACM-00007");
        assert_eq!(settings.reference.departments[0].designations.len(), 2);
        assert_eq!(settings.reference.roles[0].permissions.len(), 2);
        assert_eq!(settings.mail.transport, MailTransport::Ses);
        assert_eq!(settings.mail.ses_region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings.app.pdf_timeout_secs, 30);
        assert_eq!(settings.employee_id.format(12), "EMP0012");
        assert!(settings.reference.branches.is_empty());
        assert_eq!(settings.mail.transport, MailTransport::Disabled);
        assert_eq!(settings.app.session_ttl(), TimeDelta::hours(12));
    }

    #[test]
    fn test_huge_session_ttl_does_not_overflow() {
        let settings = parse_settings("[app]\nsession_ttl_hours = 9223372036854775807").unwrap();
        assert_eq!(settings.app.session_ttl(), TimeDelta::MAX);
    }

    #[test]
    fn test_malformed_settings_are_config_errors() {
        let result = parse_settings("[app\nname = ");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
