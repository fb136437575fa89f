// ============================
// doge-lib/src/health.rs
// ============================
//! Document-store health indicator.
use crate::storage::DocumentStore;
use serde::Serialize;
use std::sync::Arc;

/// Health check outcome, surfaced as `"ok"` / `"error"` on the wire.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Ok,
    Error,
}

/// Pings the document store and maps any connectivity fault to
/// [`Health::Error`]. Never returns an error itself.
pub struct StoreHealthIndicator<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> StoreHealthIndicator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn check(&self) -> Health {
        match self.store.ping().await {
            Ok(()) => Health::Ok,
            Err(err) => {
                tracing::warn!(error = %err, "store health probe failed");
                Health::Error
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::storage::FlatFileStore;
    use async_trait::async_trait;
    use serde_json::Value;
    use tempfile::tempdir;

    struct UnreachableStore;

    #[async_trait]
    impl DocumentStore for UnreachableStore {
        async fn put_document(&self, _: &str, _: &str, _: &Value) -> Result<(), AppError> {
            Err(AppError::Internal("store offline".to_string()))
        }
        async fn get_document(&self, _: &str, _: &str) -> Result<Option<Value>, AppError> {
            Err(AppError::Internal("store offline".to_string()))
        }
        async fn list_documents(&self, _: &str) -> Result<Vec<Value>, AppError> {
            Err(AppError::Internal("store offline".to_string()))
        }
        async fn put_blob(&self, _: &str, _: &str, _: &[u8]) -> Result<(), AppError> {
            Err(AppError::Internal("store offline".to_string()))
        }
        async fn get_blob(&self, _: &str, _: &str) -> Result<Vec<u8>, AppError> {
            Err(AppError::Internal("store offline".to_string()))
        }
        async fn ping(&self) -> Result<(), AppError> {
            Err(AppError::Internal("store offline".to_string()))
        }
    }

    #[tokio::test]
    async fn reachable_store_is_ok() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FlatFileStore::new(dir.path()).unwrap());
        let indicator = StoreHealthIndicator::new(store);
        assert_eq!(indicator.check().await, Health::Ok);
    }

    #[tokio::test]
    async fn unreachable_store_is_error_without_raising() {
        let indicator = StoreHealthIndicator::new(Arc::new(UnreachableStore));
        assert_eq!(indicator.check().await, Health::Error);
    }

    #[test]
    fn health_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Health::Ok).unwrap(), "\"ok\"");
        assert_eq!(serde_json::to_string(&Health::Error).unwrap(), "\"error\"");
    }
}
