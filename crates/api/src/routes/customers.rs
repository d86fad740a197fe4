//! Customer and address route handlers.
//!
//! Customers are addressed by document number; addresses live under their
//! customer.

use std::collections::HashMap;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use storekeep_core::{AddressId, Document, Email};

use crate::error::{ErrorBody, Result};
use crate::extract::{Json, Path, Query, document_param};
use crate::models::{Address, Customer, CustomerUpdate, NewAddress, NewCustomer};
use crate::state::AppState;
use crate::validation::{Validate, ValidationErrors, optional_text, parsed, required_text};

/// Build the customer router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list).post(create))
        .route(
            "/customers/{document}",
            get(show).put(update).delete(remove),
        )
        .route(
            "/customers/{document}/addresses",
            get(list_addresses).post(create_address),
        )
        .route(
            "/customers/{document}/addresses/{id}",
            get(show_address)
                .put(update_address)
                .delete(remove_address),
        )
}

// =============================================================================
// Request Bodies
// =============================================================================

/// Address body, standalone or nested in a customer.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct AddressRequest {
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

impl Validate for AddressRequest {
    type Output = NewAddress;

    fn validate(self) -> std::result::Result<NewAddress, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let address = NewAddress {
            street: required_text(&mut errors, "street", self.street),
            number: required_text(&mut errors, "number", self.number),
            complement: optional_text(self.complement),
            neighborhood: required_text(&mut errors, "neighborhood", self.neighborhood),
            city: required_text(&mut errors, "city", self.city),
            state: required_text(&mut errors, "state", self.state),
            zip_code: required_text(&mut errors, "zip_code", self.zip_code),
        };
        errors.into_result(address)
    }
}

/// Customer create body. Addresses are created together with the customer.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CustomerRequest {
    pub name: Option<String>,
    /// Document number, punctuation allowed.
    pub document: Option<String>,
    pub email: Option<String>,
    pub addresses: Vec<AddressRequest>,
}

impl Validate for CustomerRequest {
    type Output = NewCustomer;

    fn validate(self) -> std::result::Result<NewCustomer, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = required_text(&mut errors, "name", self.name);
        let document = required_text(&mut errors, "document", self.document);
        let document = if document.is_empty() {
            None
        } else {
            parsed(&mut errors, "document", Document::parse(&document))
        };
        let email = validate_email(&mut errors, self.email);

        let mut addresses = Vec::with_capacity(self.addresses.len());
        for (index, address) in self.addresses.into_iter().enumerate() {
            match address.validate() {
                Ok(address) => addresses.push(address),
                Err(nested) => errors.nest(&format!("addresses[{index}]"), nested),
            }
        }

        match document {
            Some(document) if errors.is_empty() => Ok(NewCustomer {
                name,
                document,
                email,
                addresses,
            }),
            _ => Err(errors),
        }
    }
}

/// Customer replace body. The document cannot change.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct CustomerUpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Validate for CustomerUpdateRequest {
    type Output = CustomerUpdate;

    fn validate(self) -> std::result::Result<CustomerUpdate, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = required_text(&mut errors, "name", self.name);
        let email = validate_email(&mut errors, self.email);
        errors.into_result(CustomerUpdate { name, email })
    }
}

fn validate_email(errors: &mut ValidationErrors, email: Option<String>) -> Option<Email> {
    optional_text(email).and_then(|email| parsed(errors, "email", Email::parse(&email)))
}

// =============================================================================
// Customers
// =============================================================================

/// Register a customer with their addresses.
#[utoipa::path(
    post,
    path = "/customers",
    tag = "customers",
    request_body = CustomerRequest,
    responses(
        (status = 201, body = Customer),
        (status = 400, body = ErrorBody),
        (status = 409, body = ErrorBody, description = "Document already registered"),
    )
)]
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CustomerRequest>,
) -> Result<(StatusCode, Json<Customer>)> {
    let customer = body.validate()?;
    let created = state.customers().create(&customer).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List customers. Filters: `name` (substring), `document`, `email`.
#[utoipa::path(
    get,
    path = "/customers",
    tag = "customers",
    params(
        ("name" = Option<String>, Query, description = "Case-insensitive substring"),
        ("document" = Option<String>, Query),
        ("email" = Option<String>, Query),
    ),
    responses(
        (status = 200, body = Vec<Customer>),
        (status = 400, body = ErrorBody),
    )
)]
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Customer>>> {
    Ok(Json(state.customers().list(&params).await?))
}

/// Fetch a customer by document.
#[utoipa::path(
    get,
    path = "/customers/{document}",
    tag = "customers",
    params(("document" = String, Path)),
    responses(
        (status = 200, body = Customer),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn show(
    State(state): State<AppState>,
    Path(document): Path<String>,
) -> Result<Json<Customer>> {
    let document = document_param(&document)?;
    Ok(Json(state.customers().get(&document).await?))
}

/// Replace a customer's name and email.
#[utoipa::path(
    put,
    path = "/customers/{document}",
    tag = "customers",
    params(("document" = String, Path)),
    request_body = CustomerUpdateRequest,
    responses(
        (status = 200, body = Customer),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
#[instrument(skip(state, body))]
pub async fn update(
    State(state): State<AppState>,
    Path(document): Path<String>,
    Json(body): Json<CustomerUpdateRequest>,
) -> Result<Json<Customer>> {
    let document = document_param(&document)?;
    let update = body.validate()?;
    Ok(Json(state.customers().update(&document, &update).await?))
}

/// Delete a customer and their addresses.
#[utoipa::path(
    delete,
    path = "/customers/{document}",
    tag = "customers",
    params(("document" = String, Path)),
    responses(
        (status = 204),
        (status = 404, body = ErrorBody),
        (status = 409, body = ErrorBody, description = "Customer has orders"),
    )
)]
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Path(document): Path<String>,
) -> Result<StatusCode> {
    let document = document_param(&document)?;
    state.customers().delete(&document).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Addresses
// =============================================================================

/// Add an address to a customer.
#[utoipa::path(
    post,
    path = "/customers/{document}/addresses",
    tag = "customers",
    params(("document" = String, Path)),
    request_body = AddressRequest,
    responses(
        (status = 201, body = Address),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
#[instrument(skip(state, body))]
pub async fn create_address(
    State(state): State<AppState>,
    Path(document): Path<String>,
    Json(body): Json<AddressRequest>,
) -> Result<(StatusCode, Json<Address>)> {
    let document = document_param(&document)?;
    let address = body.validate()?;
    let created = state.addresses().create(&document, &address).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List a customer's addresses. Filters: `city` (substring), `state`,
/// `zip_code`.
#[utoipa::path(
    get,
    path = "/customers/{document}/addresses",
    tag = "customers",
    params(
        ("document" = String, Path),
        ("city" = Option<String>, Query, description = "Case-insensitive substring"),
        ("state" = Option<String>, Query),
        ("zip_code" = Option<String>, Query),
    ),
    responses(
        (status = 200, body = Vec<Address>),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    Path(document): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Address>>> {
    let document = document_param(&document)?;
    Ok(Json(state.addresses().list(&document, &params).await?))
}

/// Fetch one of a customer's addresses.
#[utoipa::path(
    get,
    path = "/customers/{document}/addresses/{id}",
    tag = "customers",
    params(("document" = String, Path), ("id" = i32, Path)),
    responses(
        (status = 200, body = Address),
        (status = 404, body = ErrorBody),
    )
)]
pub async fn show_address(
    State(state): State<AppState>,
    Path((document, id)): Path<(String, AddressId)>,
) -> Result<Json<Address>> {
    let document = document_param(&document)?;
    Ok(Json(state.addresses().get(&document, id).await?))
}

/// Replace one of a customer's addresses.
#[utoipa::path(
    put,
    path = "/customers/{document}/addresses/{id}",
    tag = "customers",
    params(("document" = String, Path), ("id" = i32, Path)),
    request_body = AddressRequest,
    responses(
        (status = 200, body = Address),
        (status = 400, body = ErrorBody),
        (status = 404, body = ErrorBody),
    )
)]
#[instrument(skip(state, body))]
pub async fn update_address(
    State(state): State<AppState>,
    Path((document, id)): Path<(String, AddressId)>,
    Json(body): Json<AddressRequest>,
) -> Result<Json<Address>> {
    let document = document_param(&document)?;
    let address = body.validate()?;
    Ok(Json(state.addresses().update(&document, id, &address).await?))
}

/// Delete one of a customer's addresses.
#[utoipa::path(
    delete,
    path = "/customers/{document}/addresses/{id}",
    tag = "customers",
    params(("document" = String, Path), ("id" = i32, Path)),
    responses(
        (status = 204),
        (status = 404, body = ErrorBody),
    )
)]
#[instrument(skip(state))]
pub async fn remove_address(
    State(state): State<AppState>,
    Path((document, id)): Path<(String, AddressId)>,
) -> Result<StatusCode> {
    let document = document_param(&document)?;
    state.addresses().delete(&document, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_validation_nests_address_errors() {
        let errors = CustomerRequest {
            name: Some("Ada".to_string()),
            document: Some("123".to_string()),
            email: Some("not-an-email".to_string()),
            addresses: vec![AddressRequest {
                street: Some("Rua A".to_string()),
                ..AddressRequest::default()
            }],
        }
        .validate()
        .unwrap_err();

        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "document",
                "email",
                "addresses[0].number",
                "addresses[0].neighborhood",
                "addresses[0].city",
                "addresses[0].state",
                "addresses[0].zip_code",
            ]
        );
    }

    #[test]
    fn test_customer_validation_normalizes_document() {
        let customer = CustomerRequest {
            name: Some("Ada".to_string()),
            document: Some("123.456.789-09".to_string()),
            email: Some("  ".to_string()),
            addresses: Vec::new(),
        }
        .validate()
        .unwrap();

        assert_eq!(customer.document.as_str(), "12345678909");
        assert_eq!(customer.email, None);
    }

    #[test]
    fn test_missing_document_is_reported_once() {
        let errors = CustomerRequest {
            name: Some("Ada".to_string()),
            ..CustomerRequest::default()
        }
        .validate()
        .unwrap_err();

        assert_eq!(errors.messages(), vec!["document: is required"]);
    }
}
