//! Customer and address domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use storekeep_core::{AddressId, CustomerId, Document, Email};

/// A customer, identified externally by their document number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Customer {
    /// Unique customer ID.
    pub id: CustomerId,
    /// Full name.
    pub name: String,
    /// Normalized document number (unique).
    pub document: Document,
    /// Contact email.
    pub email: Option<Email>,
    /// Registered addresses, oldest first.
    pub addresses: Vec<Address>,
    /// When the customer was created.
    pub created_at: DateTime<Utc>,
    /// When the customer was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A postal address owned by exactly one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Address {
    /// Unique address ID.
    pub id: AddressId,
    /// Owning customer.
    pub customer_id: CustomerId,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    /// When the address was created.
    pub created_at: DateTime<Utc>,
    /// When the address was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a customer together with their addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub document: Document,
    pub email: Option<Email>,
    pub addresses: Vec<NewAddress>,
}

/// Replacement values for a customer. The document never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerUpdate {
    pub name: String,
    pub email: Option<Email>,
}

/// Input for creating or replacing an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
}
