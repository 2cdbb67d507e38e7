//! Unified error type for the monitoring backend.
//!
//! Core operations return [`Result`]; the HTTP layer turns each variant into a
//! status code and JSON body (see `api::error`).

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Application error
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// I/O failure (binding the listener, reading files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A row looked up by id (or login) does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity name, e.g. `"WasteBin"`
        entity: &'static str,
        /// The identifier that was looked up
        id: String,
    },

    /// The row exists but belongs to another organization
    #[error("Permission denied")]
    Forbidden,

    /// No valid session token was presented
    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,

    /// Login attempt with unknown login or wrong password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Payload failed field validation
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Request body could not be parsed
    #[error("Invalid request body: {message}")]
    BadRequest {
        /// Parser message
        message: String,
    },

    /// Hashing a password failed
    #[error("Password hashing failed: {message}")]
    PasswordHash {
        /// Underlying hasher message
        message: String,
    },
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// A validation error on a single field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::default();
        errors.add(field, message);
        Self::Validation(errors)
    }
}

/// Field name to list of messages, serialised as `{"field": ["msg", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Records a message against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Whether no errors have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `field` has at least one error.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(())` when empty, otherwise [`Error::Validation`].
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{field}: {}", messages.join(", "))?;
        }
        Ok(())
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_collect_and_display() {
        let mut errors = FieldErrors::default();
        assert!(errors.is_empty());

        errors.add("fill_level", "Ensure this value is less than or equal to 100.");
        errors.add("address", "This field is required.");

        assert!(errors.contains("address"));
        assert!(!errors.contains("location"));
        assert_eq!(
            errors.to_string(),
            "address: This field is required.; fill_level: Ensure this value is less than or equal to 100."
        );
        assert!(matches!(errors.into_result(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_empty_field_errors_are_ok() {
        assert!(FieldErrors::default().into_result().is_ok());
    }

    #[test]
    fn test_field_errors_serialize_as_map() {
        let Error::Validation(errors) = Error::field("login", "Login already in use.") else {
            panic!("expected validation error");
        };
        let json = serde_json::to_value(&errors).unwrap_or_default();
        assert_eq!(json, serde_json::json!({"login": ["Login already in use."]}));
    }
}
