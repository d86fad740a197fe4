//! Request validation.
//!
//! Request bodies are deserialized leniently (missing fields become `None` or
//! empty) and then validated into domain input. Validation collects every
//! failing field instead of stopping at the first one, so clients get the full
//! list back in the `{"error": [...]}` envelope.

use core::fmt;

use serde::Serialize;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending field as it appears on the wire.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Collected validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Create an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Shorthand for a collection with a single failure.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a failure.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Record the failures of a nested value under `prefix`.
    pub fn nest(&mut self, prefix: &str, nested: Self) {
        for error in nested.0 {
            self.0.push(FieldError {
                field: format!("{prefix}.{}", error.field),
                message: error.message,
            });
        }
    }

    /// Whether no failure has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the recorded failures.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Messages in `field: message` form.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }

    /// `Ok(value)` when nothing failed, the collected errors otherwise.
    ///
    /// # Errors
    ///
    /// Returns `self` if at least one failure was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Conversion of a raw request body into validated domain input.
pub trait Validate {
    /// The validated domain value.
    type Output;

    /// Validate every field and build the domain value.
    ///
    /// # Errors
    ///
    /// Returns all field-level failures found.
    fn validate(self) -> Result<Self::Output, ValidationErrors>;
}

/// Trim a required text field, recording an error when it is blank.
pub fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
) -> String {
    let value = value.map(|v| v.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        errors.add(field, "is required");
    }
    value
}

/// Trim an optional text field; blank input becomes `None`.
#[must_use]
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Unwrap a parsed field, recording its error message on failure.
pub fn parsed<T, E: fmt::Display>(
    errors: &mut ValidationErrors,
    field: &str,
    result: Result<T, E>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.add(field, e.to_string());
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_format() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "is required");
        errors.add("price", "amount cannot be negative");
        assert_eq!(
            errors.messages(),
            vec!["name: is required", "price: amount cannot be negative"]
        );
    }

    #[test]
    fn test_nest_prefixes_fields() {
        let mut errors = ValidationErrors::new();
        errors.nest("addresses[0]", ValidationErrors::single("city", "is required"));
        assert_eq!(errors.messages(), vec!["addresses[0].city: is required"]);
    }

    #[test]
    fn test_required_text_trims_and_flags_blank() {
        let mut errors = ValidationErrors::new();
        assert_eq!(
            required_text(&mut errors, "name", Some("  Burger ".to_string())),
            "Burger"
        );
        assert!(errors.is_empty());

        required_text(&mut errors, "name", Some("   ".to_string()));
        required_text(&mut errors, "description", None);
        assert_eq!(errors.iter().count(), 2);
    }

    #[test]
    fn test_optional_text_drops_blank() {
        assert_eq!(optional_text(Some("  ".to_string())), None);
        assert_eq!(optional_text(Some(" x ".to_string())), Some("x".to_string()));
    }

    #[test]
    fn test_into_result() {
        assert_eq!(ValidationErrors::new().into_result(5).unwrap(), 5);
        assert!(ValidationErrors::single("a", "b").into_result(5).is_err());
    }
}
