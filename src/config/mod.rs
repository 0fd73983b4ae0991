/// Database configuration and connection management
pub mod database;

/// Installation settings from config.toml
pub mod settings;

pub use settings::{AppSettings, EmployeeIdScheme, MailSettings, MailTransport, Settings};
