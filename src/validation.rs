//! Validation Support
//!
//! Payload validation for create and update requests. A resource registers a
//! [`PayloadValidator`] on its descriptor; the controller runs
//! `rules_for_create` before inserting and `rules_for_update` after the target
//! record is known to exist.
//!
//! # Example
//!
//! ```rust,ignore
//! use restcrate::validation::{PayloadValidator, ValidationErrors, validators};
//! use serde_json::Value;
//!
//! struct PostRules;
//!
//! impl PayloadValidator for PostRules {
//!     fn rules_for_create(&self, payload: &Value) -> Result<(), ValidationErrors> {
//!         let mut errors = ValidationErrors::new();
//!         let title = payload.get("title").and_then(Value::as_str).unwrap_or_default();
//!         errors.check(validators::validate_required("title", title));
//!         errors.check(validators::validate_length("title", title, None, Some(200)));
//!         errors.result()
//!     }
//! }
//! ```

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Validation error with field name and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validation failures keyed by field, serialized as `{"field": ["message", ...]}`.
///
/// Fields keep the order in which they first failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: IndexMap<String, Vec<String>>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.fields.entry(error.field).or_default().push(error.message);
    }

    /// Record the error of a validator result, if any.
    pub fn check(&mut self, result: Result<(), ValidationError>) {
        if let Err(error) = result {
            self.add(error);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of messages across all fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn messages(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Convert to Result
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was recorded.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        let mut errors = Self::new();
        errors.add(error);
        errors
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.len())?;
        for (field, messages) in &self.fields {
            for message in messages {
                write!(f, "\n  - {field}: {message}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Per-resource validation rules for write payloads.
///
/// `payload` is the object found under the resource's singular key. Both rule
/// sets accept everything unless overridden.
pub trait PayloadValidator: Send + Sync {
    /// Rules applied before a record is created.
    ///
    /// # Errors
    ///
    /// The collected field errors; the request fails with status 400.
    fn rules_for_create(&self, payload: &Value) -> Result<(), ValidationErrors> {
        let _ = payload;
        Ok(())
    }

    /// Rules applied before the record identified by `id` is updated.
    ///
    /// # Errors
    ///
    /// The collected field errors; the request fails with status 400.
    fn rules_for_update(&self, id: &str, payload: &Value) -> Result<(), ValidationErrors> {
        let _ = (id, payload);
        Ok(())
    }
}

/// Validator that accepts every payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl PayloadValidator for AcceptAll {}

/// Helper validators for common patterns
pub mod validators {
    use super::ValidationError;
    use std::fmt;

    /// Validate string length (in characters) is within range
    ///
    /// # Errors
    ///
    /// When the length falls outside `min..=max`.
    pub fn validate_length(
        field: &str,
        value: &str,
        min: Option<usize>,
        max: Option<usize>,
    ) -> Result<(), ValidationError> {
        let len = value.chars().count();

        if let Some(min_len) = min
            && len < min_len
        {
            return Err(ValidationError::new(
                field,
                format!("Must be at least {min_len} characters"),
            ));
        }

        if let Some(max_len) = max
            && len > max_len
        {
            return Err(ValidationError::new(
                field,
                format!("Must be at most {max_len} characters"),
            ));
        }

        Ok(())
    }

    /// Validate number is within range
    ///
    /// # Errors
    ///
    /// When `value` falls outside `min..=max`.
    pub fn validate_range<T: PartialOrd + fmt::Display>(
        field: &str,
        value: T,
        min: Option<T>,
        max: Option<T>,
    ) -> Result<(), ValidationError> {
        if let Some(min_val) = min
            && value < min_val
        {
            return Err(ValidationError::new(field, format!("Must be at least {min_val}")));
        }

        if let Some(max_val) = max
            && value > max_val
        {
            return Err(ValidationError::new(field, format!("Must be at most {max_val}")));
        }

        Ok(())
    }

    /// Basic email validation
    ///
    /// # Errors
    ///
    /// When the address lacks `@` or a dot, or exceeds 255 characters.
    pub fn validate_email(field: &str, value: &str) -> Result<(), ValidationError> {
        if !value.contains('@') || !value.contains('.') {
            return Err(ValidationError::new(field, "Invalid email format"));
        }

        if value.len() > 255 {
            return Err(ValidationError::new(field, "Email must be at most 255 characters"));
        }

        Ok(())
    }

    /// Validate value is not blank
    ///
    /// # Errors
    ///
    /// When `value` is empty or whitespace.
    pub fn validate_required(field: &str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new(field, "This field is required"));
        }
        Ok(())
    }
}
