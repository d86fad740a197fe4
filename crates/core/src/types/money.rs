//! Monetary amounts using decimal arithmetic.
//!
//! Prices are stored as `NUMERIC(12, 2)` and carried around as [`Money`].
//! The store works in a single currency, so no currency code travels with
//! the amount.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Money`] value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount is below zero.
    #[error("amount cannot be negative")]
    Negative,
    /// The amount has more fractional digits than the currency allows.
    #[error("amount must have at most {max} decimal places")]
    TooPrecise {
        /// Maximum allowed fractional digits.
        max: u32,
    },
    /// The amount does not fit the storage column.
    #[error("amount must be less than {max}")]
    TooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },
}

/// A non-negative amount of money with at most two decimal places.
///
/// ```
/// use rust_decimal::Decimal;
/// use storekeep_core::Money;
///
/// let price = Money::parse(Decimal::new(1250, 2)).unwrap();
/// assert_eq!(price.to_string(), "12.50");
/// assert_eq!(price.times(3).unwrap().to_string(), "37.50");
///
/// assert!(Money::parse(Decimal::new(-1, 0)).is_err());
/// assert!(Money::parse(Decimal::new(1001, 3)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Fractional digits kept for every amount.
    pub const SCALE: u32 = 2;

    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Validate and wrap a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, has more than two decimal
    /// places, or does not fit `NUMERIC(12, 2)`.
    pub fn parse(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative);
        }

        let normalized = amount.normalize();
        if normalized.scale() > Self::SCALE {
            return Err(MoneyError::TooPrecise { max: Self::SCALE });
        }

        let max = Self::upper_bound();
        if normalized >= max {
            return Err(MoneyError::TooLarge { max });
        }

        let mut value = normalized;
        value.rescale(Self::SCALE);
        Ok(Self(value))
    }

    /// Exclusive upper bound of a `NUMERIC(12, 2)` column.
    fn upper_bound() -> Decimal {
        Decimal::new(10_000_000_000, 0)
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a quantity.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::TooLarge` if the product does not fit
    /// `NUMERIC(12, 2)`.
    pub fn times(&self, quantity: u32) -> Result<Self, MoneyError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map_or_else(|| Err(Self::too_large()), Self::parse)
    }

    /// Add another amount.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::TooLarge` if the sum does not fit
    /// `NUMERIC(12, 2)`.
    pub fn plus(&self, other: Self) -> Result<Self, MoneyError> {
        self.0
            .checked_add(other.0)
            .map_or_else(|| Err(Self::too_large()), Self::parse)
    }

    fn too_large() -> MoneyError {
        MoneyError::TooLarge {
            max: Self::upper_bound(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // The column constraint guarantees a valid amount
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rescales_to_two_places() {
        let money = Money::parse(Decimal::new(5, 0)).unwrap();
        assert_eq!(money.amount().scale(), 2);
        assert_eq!(money.to_string(), "5.00");
    }

    #[test]
    fn test_parse_accepts_trailing_zeros() {
        // 1.5000 normalizes to 1.5
        assert!(Money::parse(Decimal::new(15000, 4)).is_ok());
    }

    #[test]
    fn test_parse_zero() {
        assert_eq!(Money::parse(Decimal::ZERO).unwrap(), Money::ZERO);
    }

    #[test]
    fn test_parse_negative() {
        assert_eq!(
            Money::parse(Decimal::new(-100, 2)),
            Err(MoneyError::Negative)
        );
    }

    #[test]
    fn test_parse_too_precise() {
        assert!(matches!(
            Money::parse(Decimal::new(12345, 3)),
            Err(MoneyError::TooPrecise { max: 2 })
        ));
    }

    #[test]
    fn test_parse_too_large() {
        assert!(matches!(
            Money::parse(Decimal::new(10_000_000_000, 0)),
            Err(MoneyError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_plus_and_times() {
        let a = Money::parse(Decimal::new(1990, 2)).unwrap();
        let b = Money::parse(Decimal::new(550, 2)).unwrap();
        let total = a.times(2).unwrap().plus(b).unwrap();
        assert_eq!(total.to_string(), "45.30");
    }

    #[test]
    fn test_arithmetic_stays_within_column_bound() {
        let price = Money::parse(Decimal::new(999_999_999_999, 2)).unwrap();
        assert!(matches!(price.times(999), Err(MoneyError::TooLarge { .. })));
        assert!(matches!(price.plus(price), Err(MoneyError::TooLarge { .. })));

        let half = Money::parse(Decimal::new(5_000_000_000, 0) - Decimal::ONE).unwrap();
        assert!(half.times(2).is_ok());
        assert!(half.times(3).is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let money = Money::parse(Decimal::new(1250, 2)).unwrap();
        assert_eq!(serde_json::to_string(&money).unwrap(), "\"12.50\"");
    }
}
