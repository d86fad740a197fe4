//! Customer document number (tax id).
//!
//! Customers are identified by their document number. Input may carry the
//! usual punctuation (`123.456.789-09`, `12.345.678/0001-95`); the stored
//! form keeps digits only.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Document`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The input string is empty.
    #[error("document cannot be empty")]
    Empty,
    /// The input contains something other than digits and separators.
    #[error("document must contain only digits (found '{0}')")]
    InvalidCharacter(char),
    /// Wrong number of digits.
    #[error("document must have between {min} and {max} digits")]
    InvalidLength {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A normalized document number.
///
/// ## Constraints
///
/// - Separators `.`, `-`, `/` and spaces are stripped
/// - Remaining characters must all be ASCII digits
/// - 11 to 14 digits (individual and company documents)
///
/// ```
/// use storekeep_core::Document;
///
/// let doc = Document::parse("123.456.789-09").unwrap();
/// assert_eq!(doc.as_str(), "12345678909");
///
/// assert!(Document::parse("").is_err());
/// assert!(Document::parse("12345").is_err());
/// assert!(Document::parse("1234567890a").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct Document(String);

impl Document {
    /// Minimum number of digits.
    pub const MIN_DIGITS: usize = 11;
    /// Maximum number of digits.
    pub const MAX_DIGITS: usize = 14;

    /// Parse and normalize a document number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains non-digit characters
    /// other than separators, or has the wrong number of digits.
    pub fn parse(s: &str) -> Result<Self, DocumentError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DocumentError::Empty);
        }

        let mut digits = String::with_capacity(trimmed.len());
        for c in trimmed.chars() {
            match c {
                '0'..='9' => digits.push(c),
                '.' | '-' | '/' | ' ' => {}
                other => return Err(DocumentError::InvalidCharacter(other)),
            }
        }

        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return Err(DocumentError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(digits))
    }

    /// Returns the normalized digits.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Document` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Document {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Document {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Document {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Document {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Document {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_separators() {
        assert_eq!(
            Document::parse("12.345.678/0001-95").unwrap().as_str(),
            "12345678000195"
        );
        assert_eq!(
            Document::parse(" 123 456 789 09 ").unwrap().as_str(),
            "12345678909"
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Document::parse("   "), Err(DocumentError::Empty));
    }

    #[test]
    fn test_parse_invalid_character() {
        assert_eq!(
            Document::parse("123456789x9"),
            Err(DocumentError::InvalidCharacter('x'))
        );
    }

    #[test]
    fn test_parse_length_bounds() {
        assert!(Document::parse("1234567890").is_err());
        assert!(Document::parse("12345678901").is_ok());
        assert!(Document::parse("12345678901234").is_ok());
        assert!(Document::parse("123456789012345").is_err());
    }
}
