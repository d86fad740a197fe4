//! Status enums for orders and payments.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a status code string is not part of the enumeration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}', expected one of: {expected}")]
pub struct UnknownStatus {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

/// Lifecycle state of an order.
///
/// The set is closed: status rows in the database carry one of these codes
/// plus a free-form label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storekeep.order_status_code", rename_all = "snake_case")
)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusCode {
    /// Created at checkout, waiting for payment.
    Pending,
    /// Payment approved.
    Paid,
    /// Being prepared.
    Preparing,
    /// Ready for pickup or delivery.
    Ready,
    /// Handed over; the order is done.
    Completed,
    /// Payment refused or order cancelled.
    Cancelled,
}

impl OrderStatusCode {
    /// Every code, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Paid,
        Self::Preparing,
        Self::Ready,
        Self::Completed,
        Self::Cancelled,
    ];

    /// Status assigned to orders created at checkout.
    pub const INITIAL: Self = Self::Pending;

    const EXPECTED: &'static str = "pending, paid, preparing, ready, completed, cancelled";

    /// Whether moving to this status completes the order (sets `done_at`).
    #[must_use]
    pub const fn is_completion(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Wire/database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-readable label used when seeding the status table.
    #[must_use]
    pub const fn default_label(self) -> &'static str {
        match self {
            Self::Pending => "Awaiting payment",
            Self::Paid => "Paid",
            Self::Preparing => "In preparation",
            Self::Ready => "Ready",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusCode {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownStatus {
                kind: "order status",
                value: s.to_string(),
                expected: Self::EXPECTED,
            })
    }
}

/// State of a payment, as reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storekeep.payment_status", rename_all = "snake_case")
)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Approved,
    Refused,
}

impl PaymentStatus {
    const EXPECTED: &'static str = "pending, approved, refused";

    /// Order status the linked order moves to when the payment reaches this
    /// state. `None` leaves the order untouched.
    #[must_use]
    pub const fn order_transition(self) -> Option<OrderStatusCode> {
        match self {
            Self::Pending => None,
            Self::Approved => Some(OrderStatusCode::Paid),
            Self::Refused => Some(OrderStatusCode::Cancelled),
        }
    }

    /// Wire/database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Refused => "refused",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "refused" => Ok(Self::Refused),
            _ => Err(UnknownStatus {
                kind: "payment status",
                value: s.to_string(),
                expected: Self::EXPECTED,
            }),
        }
    }
}
