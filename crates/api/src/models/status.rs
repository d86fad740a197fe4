//! Order status lookup rows.

use serde::Serialize;
use utoipa::ToSchema;

use storekeep_core::{OrderStatusCode, StatusId};

/// A status row: one per [`OrderStatusCode`], with a display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Status {
    pub id: StatusId,
    pub code: OrderStatusCode,
    pub label: String,
}

/// Input for creating or replacing a status row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatus {
    pub code: OrderStatusCode,
    pub label: String,
}
