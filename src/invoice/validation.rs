//! Request validation for invoice generation.
//!
//! Errors carry the exact message the HTTP layer returns, so existing
//! clients that match on strings like `Missing required field: items`
//! keep working.

use std::fmt;

#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Error for a section the payload must carry.
    pub fn missing_field(field: &str) -> Self {
        Self::new(field, format!("Missing required field: {field}"))
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors with formatted output.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn to_message(&self) -> String {
        let parts: Vec<String> = self.errors.iter().map(ValidationError::to_string).collect();
        parts.join("; ")
    }

    /// Ok when no errors were recorded, Err with the joined message otherwise.
    pub fn into_result(self) -> Result<(), String> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.to_message())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message_is_wire_exact() {
        let error = ValidationError::missing_field("items");
        assert_eq!(error.to_string(), "Missing required field: items");
        assert_eq!(error.field, "items");
    }

    #[test]
    fn test_empty_errors_resolve_to_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_errors_join_with_semicolons() {
        let mut errors = ValidationErrors::new();
        errors.add(ValidationError::missing_field("client_info"));
        errors.add(ValidationError::missing_field("financials"));
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.into_result().unwrap_err(),
            "Missing required field: client_info; Missing required field: financials"
        );
    }
}
