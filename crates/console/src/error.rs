//! Unified error handling for the console.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use backoffice_core::{ResourceFamily, Role};

use crate::api::{ApiError, ErrorClass};
use crate::config::ConfigError;

/// Per-field validation messages, keyed by the form's wire field name.
///
/// Filled either by client-side validation before any network call or from
/// a server validation response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Messages for one field (empty when the field is valid).
    #[must_use]
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names of the fields that carry at least one message.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Application-level error type for the console.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Remote API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The principal's role may not use the console.
    #[error("Not allowed: the {0} role cannot use the console")]
    NotAllowed(Role),

    /// Filter name not declared by the family's table.
    #[error("Unknown filter '{name}' for {family}")]
    UnknownFilter {
        family: ResourceFamily,
        name: String,
    },

    /// Filter value outside the filter's option set.
    #[error("Invalid value '{value}' for filter '{name}'")]
    InvalidFilterValue { name: String, value: String },

    /// Client-side form validation failed.
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    /// Submit was attempted with no open edit panel.
    #[error("No form panel is open")]
    PanelClosed,
}

impl ConsoleError {
    /// Error class used by the propagation policy.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Api(err) => err.class(),
            Self::Validation(_) => ErrorClass::Validation,
            Self::NotAllowed(_) => ErrorClass::Auth,
            Self::Config(_)
            | Self::UnknownFilter { .. }
            | Self::InvalidFilterValue { .. }
            | Self::PanelClosed => ErrorClass::Other,
        }
    }

    /// Log the error and forward unexpected failures to Sentry.
    ///
    /// Validation and authorization outcomes are expected operator-facing
    /// results and are only logged.
    pub fn report(&self) {
        if matches!(self.class(), ErrorClass::Transient | ErrorClass::Other) {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Console operation failed"
            );
        } else {
            tracing::warn!(error = %self, "Console operation rejected");
        }
    }
}
