//! Use-case services.
//!
//! # Services
//!
//! - `customers` - Customer CRUD, customer + addresses created together
//! - `addresses` - Address CRUD scoped to a customer
//! - `products` - Product CRUD
//! - `statuses` - Order status rows
//! - `checkout` - Basket pricing and atomic order placement
//! - `orders` - Order reads and status transitions
//! - `payments` - Payment lookup and provider notifications by `nsu`
//!
//! Services take validated domain input, sequence repository calls through
//! the ports in [`crate::db`] and report failures as [`ServiceError`].

pub mod addresses;
pub mod checkout;
pub mod customers;
pub mod orders;
pub mod payments;
pub mod products;
pub mod statuses;

use thiserror::Error;

use storekeep_core::OrderStatusCode;

use crate::db::RepositoryError;
use crate::validation::ValidationErrors;

pub use addresses::AddressService;
pub use checkout::{CheckoutLine, CheckoutRequest, CheckoutService};
pub use customers::CustomerService;
pub use orders::OrderService;
pub use payments::{PaymentNotification, PaymentService};
pub use products::ProductService;
pub use statuses::StatusService;

/// Errors returned by services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The operation clashes with existing data.
    #[error("{0}")]
    Conflict(String),

    /// The status table has no row for a code the workflow needs.
    #[error("status '{0}' is not configured")]
    MissingStatus(OrderStatusCode),

    /// Storage failure.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl ServiceError {
    pub(crate) fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    /// Like `From<RepositoryError>`, but names the missing entity.
    pub(crate) fn from_repository(err: RepositoryError, what: impl std::fmt::Display) -> Self {
        match err {
            RepositoryError::NotFound => Self::not_found(what),
            other => other.into(),
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource not found".to_owned()),
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Repository(other),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_errors_map_to_service_errors() {
        assert!(matches!(
            ServiceError::from(RepositoryError::NotFound),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            ServiceError::from(RepositoryError::Conflict("dup".to_owned())),
            ServiceError::Conflict(m) if m == "dup"
        ));
        assert!(matches!(
            ServiceError::from(RepositoryError::DataCorruption("bad".to_owned())),
            ServiceError::Repository(_)
        ));
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            ServiceError::not_found("product 42").to_string(),
            "product 42 not found"
        );
    }
}
