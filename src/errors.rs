//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. Errors carry enough
//! structure for the web layer to decide how to answer: each variant maps onto
//! one [`ErrorKind`], and validation failures keep their per-field messages.

use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Broad classification used at the boundary to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Field-level input problems, rendered inline next to the field.
    Validation,
    /// Unique-constraint style clashes, surfaced as a single message.
    Conflict,
    /// The referenced record does not exist.
    NotFound,
    /// The principal may not perform the action.
    Forbidden,
    /// Transport or datastore availability; the operator may retry.
    Transient,
    /// Anything unexpected.
    Fatal,
}

/// Field name to message map for validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Creates an empty set of field errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message for `field`. The first message for a field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    /// Returns the message recorded for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Whether any field failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the collected messages into `Err(Error::Validation)` when non-empty.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation { errors: self })
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation failed: {errors}")]
    Validation { errors: FieldErrors },

    #[error("{message}")]
    InvalidState { message: String },

    #[error("{message}")]
    Conflict { message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Permission denied: {permission}")]
    Forbidden { permission: String },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },

    #[error("Mail transport error: {message}")]
    Mail { message: String },

    #[error("File storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database unavailable: {0}")]
    DatabaseUnavailable(DbErr),

    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Password hashing failed: {message}")]
    PasswordHash { message: String },

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    /// Builds a single-field validation error.
    #[must_use]
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::Validation { errors }
    }

    /// Builds a not-found error for `entity` with the given identifier.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classifies the error per the boundary handling rules.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } | Self::InvalidState { .. } => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } | Self::Unauthenticated => ErrorKind::Forbidden,
            Self::Timeout { .. }
            | Self::Mail { .. }
            | Self::Io(_)
            | Self::DatabaseUnavailable(_) => ErrorKind::Transient,
            Self::Database(_) | Self::Config { .. } | Self::PasswordHash { .. } | Self::Join(_) => {
                ErrorKind::Fatal
            }
        }
    }
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return Self::Conflict {
                message: format!("A record with the same unique value already exists ({detail})"),
            };
        }
        match err {
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => Self::DatabaseUnavailable(err),
            other => Self::Database(other),
        }
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self::PasswordHash {
            message: err.to_string(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_keep_first_message() {
        let mut errors = FieldErrors::new();
        errors.add("email", "The email field is required.");
        errors.add("email", "second");
        assert_eq!(errors.get("email"), Some("The email field is required."));
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_empty_field_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::field("a", "b").kind(), ErrorKind::Validation);
        assert_eq!(Error::not_found("Candidate", 4).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::Mail {
                message: "down".to_string()
            }
            .kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            Error::from(DbErr::Custom("boom".to_string())).kind(),
            ErrorKind::Fatal
        );
    }
}
