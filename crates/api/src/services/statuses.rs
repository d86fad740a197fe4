//! Order status rows.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};

use storekeep_core::StatusId;

use super::ServiceError;
use crate::db::{Filters, STATUS_FILTERS, StatusRepository};
use crate::models::{NewStatus, Status};

/// Status CRUD.
#[derive(Clone)]
pub struct StatusService {
    statuses: Arc<dyn StatusRepository>,
}

impl StatusService {
    /// Create a new status service.
    #[must_use]
    pub fn new(statuses: Arc<dyn StatusRepository>) -> Self {
        Self { statuses }
    }

    /// Add a status row.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` if a row already uses the code.
    #[instrument(skip(self, status), fields(code = %status.code))]
    pub async fn create(&self, status: &NewStatus) -> Result<Status, ServiceError> {
        let status = self.statuses.create(status).await?;
        info!(status_id = %status.id, "Status created");
        Ok(status)
    }

    /// Fetch a status row.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no row has this id.
    pub async fn get(&self, id: StatusId) -> Result<Status, ServiceError> {
        self.statuses
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("status {id}")))
    }

    /// List status rows matching the query-string filters.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for unknown filter keys or bad values.
    pub async fn list(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<Vec<Status>, ServiceError> {
        let filters = Filters::parse(STATUS_FILTERS, params)?;
        Ok(self.statuses.list(&filters).await?)
    }

    /// Replace a status row.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no row has this id, and
    /// `ServiceError::Conflict` if another row already uses the code.
    #[instrument(skip(self, status))]
    pub async fn update(&self, id: StatusId, status: &NewStatus) -> Result<Status, ServiceError> {
        self.statuses
            .update(id, status)
            .await
            .map_err(|e| ServiceError::from_repository(e, format!("status {id}")))
    }

    /// Delete a status row.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no row has this id, and
    /// `ServiceError::Conflict` while orders still point at it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: StatusId) -> Result<(), ServiceError> {
        if self.statuses.delete(id).await? {
            info!(status_id = %id, "Status deleted");
            Ok(())
        } else {
            Err(ServiceError::not_found(format!("status {id}")))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use storekeep_core::OrderStatusCode;

    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_duplicate_code_conflicts() {
        let statuses = StatusService::new(Arc::new(MemoryStore::new()));
        let status = NewStatus {
            code: OrderStatusCode::Ready,
            label: "Ready for pickup".to_owned(),
        };

        statuses.create(&status).await.unwrap();
        assert!(matches!(
            statuses.create(&status).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_list_by_code() {
        let statuses = StatusService::new(Arc::new(MemoryStore::with_default_statuses()));

        let all = statuses.list(&HashMap::new()).await.unwrap();
        assert_eq!(all.len(), OrderStatusCode::ALL.len());

        let params = HashMap::from([("code".to_owned(), "paid".to_owned())]);
        let paid = statuses.list(&params).await.unwrap();
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].code, OrderStatusCode::Paid);
    }

    #[tokio::test]
    async fn test_update_missing_status() {
        let statuses = StatusService::new(Arc::new(MemoryStore::new()));
        let err = statuses
            .update(
                StatusId::new(7),
                &NewStatus {
                    code: OrderStatusCode::Paid,
                    label: "Paid".to_owned(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "status 7 not found");
    }

    #[tokio::test]
    async fn test_delete_then_not_found() {
        let statuses = StatusService::new(Arc::new(MemoryStore::with_default_statuses()));
        let first = statuses.list(&HashMap::new()).await.unwrap()[0].id;

        statuses.delete(first).await.unwrap();
        assert!(matches!(
            statuses.delete(first).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
