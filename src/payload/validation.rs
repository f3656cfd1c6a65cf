//! Input validation for report payloads.
//!
//! Errors carry the JSON path of the offending field so callers can fix the
//! payload without guessing.

use std::fmt;

/// Validation error with a field path and a readable message.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path of the field that failed validation, e.g. `sections.shop.by_state[2].state`
    pub field: String,
    pub message: String,
    /// Suggestion for how to fix the error
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Create error for empty required field
    pub fn empty_field(field: &str, label: &str) -> Self {
        Self::new(field, format!("{} must not be empty", label))
            .with_suggestion(format!("Provide a {} for every row", label.to_lowercase()))
    }

    /// Create error for a negative or non-finite figure
    pub fn invalid_figure(field: &str, value: f64) -> Self {
        Self::new(field, format!("Figure {} is not a valid stock value", value))
            .with_suggestion("Omit absent figures instead of sending negative placeholders")
    }

    /// Create error for a series that does not line up with its labels
    pub fn length_mismatch(field: &str, actual: usize, expected: usize) -> Self {
        Self::new(
            field,
            format!("Series has {} values but half_year has {} labels", actual, expected),
        )
        .with_suggestion("Every trend series must align by index with half_year")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {}", suggestion)?;
        }
        Ok(())
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

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// Single message listing every error, suitable for an HTTP 400 body.
    pub fn to_message(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }

        let mut parts = vec![format!(
            "Payload validation failed: {} error(s) found",
            self.errors.len()
        )];

        for (i, error) in self.errors.iter().enumerate() {
            parts.push(format!("{}. {}", i + 1, error));
        }

        parts.join("\n")
    }

    /// Ok if no errors were collected
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_message())
    }
}

impl std::error::Error for ValidationErrors {}

// ============================================================================
// Validation functions
// ============================================================================

/// Validate that a string is not empty after trimming
pub fn validate_required(value: &str, field: &str, label: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::empty_field(field, label));
    }
}

/// Validate that a stock figure is finite and non-negative
pub fn validate_figure(value: f64, field: &str, errors: &mut ValidationErrors) {
    if !value.is_finite() || value < 0.0 {
        errors.add(ValidationError::invalid_figure(field, value));
    }
}

/// Validate that a series has exactly as many values as its label axis
pub fn validate_series_length(
    actual: usize,
    expected: usize,
    field: &str,
    errors: &mut ValidationErrors,
) {
    if actual != expected {
        errors.add(ValidationError::length_mismatch(field, actual, expected));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_suggestion() {
        let error = ValidationError::empty_field("sections.shop.by_state[0].state", "State");
        let text = error.to_string();
        assert!(text.starts_with("[sections.shop.by_state[0].state] State must not be empty"));
        assert!(text.contains("Provide a state"));
    }

    #[test]
    fn test_zero_is_a_valid_figure() {
        let mut errors = ValidationErrors::new();
        validate_figure(0.0, "x", &mut errors);
        assert!(errors.is_empty());

        validate_figure(f64::NAN, "y", &mut errors);
        validate_figure(-3.0, "z", &mut errors);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_message_numbers_errors() {
        let mut errors = ValidationErrors::new();
        validate_series_length(1, 2, "trends.starts", &mut errors);
        validate_required("", "title", "Title", &mut errors);

        let message = errors.to_message();
        assert!(message.contains("2 error(s)"));
        assert!(message.contains("1. [trends.starts]"));
        assert!(message.contains("2. [title]"));
        assert!(errors.into_result().is_err());
    }
}
