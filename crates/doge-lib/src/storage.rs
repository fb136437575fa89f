// ============================
// doge-lib/src/storage.rs
// ============================
//! Document-store abstraction with flat-file implementation.
//!
//! The store is an opaque collaborator: documents are JSON values upserted
//! by id inside named collections, binaries live in named folders. All
//! concurrency control is delegated to the store itself.
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokio::fs as tokio_fs;

/// Trait for document-store backends
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Upsert a JSON document by id
    async fn put_document(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> Result<(), AppError>;

    /// Fetch a document by id, `None` when absent
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, AppError>;

    /// Snapshot of every document in a collection, unordered
    async fn list_documents(&self, collection: &str) -> Result<Vec<Value>, AppError>;

    /// Write binary content into a named folder
    async fn put_blob(&self, folder: &str, id: &str, bytes: &[u8]) -> Result<(), AppError>;

    /// Read binary content back from a named folder
    async fn get_blob(&self, folder: &str, id: &str) -> Result<Vec<u8>, AppError>;

    /// Lightweight metadata probe used by the health indicator
    async fn ping(&self) -> Result<(), AppError>;
}

/// Flat-file implementation of the `DocumentStore` trait
#[derive(Clone)]
pub struct FlatFileStore {
    root: PathBuf,
}

/// Collection, folder, and document ids become path segments; anything that
/// could traverse out of the store root is rejected before it touches the
/// filesystem.
fn validate_key(value: &str) -> Result<(), AppError> {
    let well_formed = !value.is_empty()
        && value != "."
        && !value.contains("..")
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if well_formed {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!("invalid store key: {value}")))
    }
}

impl FlatFileStore {
    /// Open the store rooted at `root`. A failure here is fatal to boot.
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join("collections"))?;
        fs::create_dir_all(root.join("blobs"))?;
        Ok(Self { root })
    }

    fn document_path(&self, collection: &str, id: &str) -> Result<PathBuf, AppError> {
        validate_key(collection)?;
        validate_key(id)?;
        Ok(self
            .root
            .join("collections")
            .join(collection)
            .join(format!("{id}.json")))
    }

    fn blob_path(&self, folder: &str, id: &str) -> Result<PathBuf, AppError> {
        validate_key(folder)?;
        validate_key(id)?;
        Ok(self.root.join("blobs").join(folder).join(id))
    }
}

#[async_trait]
impl DocumentStore for FlatFileStore {
    async fn put_document(
        &self,
        collection: &str,
        id: &str,
        body: &Value,
    ) -> Result<(), AppError> {
        let path = self.document_path(collection, id)?;
        if let Some(parent) = path.parent() {
            tokio_fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(body)?;
        tokio_fs::write(path, json).await?;
        Ok(())
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, AppError> {
        let path = self.document_path(collection, id)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio_fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Value>, AppError> {
        validate_key(collection)?;
        let dir = self.root.join("collections").join(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        let mut entries = tokio_fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                let content = tokio_fs::read_to_string(entry.path()).await?;
                documents.push(serde_json::from_str(&content)?);
            }
        }
        Ok(documents)
    }

    async fn put_blob(&self, folder: &str, id: &str, bytes: &[u8]) -> Result<(), AppError> {
        let path = self.blob_path(folder, id)?;
        if let Some(parent) = path.parent() {
            tokio_fs::create_dir_all(parent).await?;
        }
        tokio_fs::write(path, bytes).await?;
        Ok(())
    }

    async fn get_blob(&self, folder: &str, id: &str) -> Result<Vec<u8>, AppError> {
        let path = self.blob_path(folder, id)?;
        if !path.exists() {
            return Err(AppError::PhotoNotFound);
        }
        Ok(tokio_fs::read(&path).await?)
    }

    async fn ping(&self) -> Result<(), AppError> {
        tokio_fs::metadata(&self.root).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn put_then_get_document() {
        let dir = tempdir().unwrap();
        let store = FlatFileStore::new(dir.path()).unwrap();

        store
            .put_document("users", "philwebb", &json!({"username": "philwebb"}))
            .await
            .unwrap();

        let doc = store.get_document("users", "philwebb").await.unwrap();
        assert_eq!(doc, Some(json!({"username": "philwebb"})));
    }

    #[tokio::test]
    async fn get_missing_document_is_none() {
        let dir = tempdir().unwrap();
        let store = FlatFileStore::new(dir.path()).unwrap();
        let doc = store.get_document("users", "nobody").await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn put_is_upsert() {
        let dir = tempdir().unwrap();
        let store = FlatFileStore::new(dir.path()).unwrap();

        store
            .put_document("users", "philwebb", &json!({"display_name": "Phil"}))
            .await
            .unwrap();
        store
            .put_document("users", "philwebb", &json!({"display_name": "Phil Webb"}))
            .await
            .unwrap();

        let docs = store.list_documents("users").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["display_name"], "Phil Webb");
    }

    #[tokio::test]
    async fn list_of_empty_collection_is_empty() {
        let dir = tempdir().unwrap();
        let store = FlatFileStore::new(dir.path()).unwrap();
        assert!(store.list_documents("ghosts").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blob_round_trip() {
        let dir = tempdir().unwrap();
        let store = FlatFileStore::new(dir.path()).unwrap();

        store.put_blob("photos", "p1", b"\x89PNG bytes").await.unwrap();
        let bytes = store.get_blob("photos", "p1").await.unwrap();
        assert_eq!(bytes, b"\x89PNG bytes");
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let dir = tempdir().unwrap();
        let store = FlatFileStore::new(dir.path()).unwrap();
        let err = store.get_blob("photos", "absent").await.unwrap_err();
        assert!(matches!(err, AppError::PhotoNotFound));
    }

    #[tokio::test]
    async fn traversal_shaped_ids_cannot_escape_a_collection() {
        let dir = tempdir().unwrap();
        let store = FlatFileStore::new(dir.path()).unwrap();

        store
            .put_document("secrets", "token", &json!({"value": "hunter2"}))
            .await
            .unwrap();

        let err = store
            .get_document("users", "../secrets/token")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = store
            .put_document("users", "../../outside", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(!dir.path().parent().unwrap().join("outside.json").exists());
    }

    #[tokio::test]
    async fn traversal_shaped_ids_cannot_escape_a_blob_folder() {
        let dir = tempdir().unwrap();
        let store = FlatFileStore::new(dir.path()).unwrap();

        store.put_blob("private", "key", b"secret").await.unwrap();

        let err = store.get_blob("photos", "../private/key").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = store.put_blob("photos", "a/b", b"x").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn empty_and_dot_ids_are_rejected() {
        let dir = tempdir().unwrap();
        let store = FlatFileStore::new(dir.path()).unwrap();

        for id in ["", ".", "..", "a..b"] {
            let err = store.get_document("users", id).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "id {id:?}");
        }
        let err = store.list_documents("../collections").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn ping_reports_root_presence() {
        let dir = tempdir().unwrap();
        let store = FlatFileStore::new(dir.path()).unwrap();
        assert!(store.ping().await.is_ok());

        drop(dir); // removes the root out from under the store
        assert!(store.ping().await.is_err());
    }
}
