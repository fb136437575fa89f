// ============================
// doge-lib/src/photo.rs
// ============================
//! Photo binaries: the named-folder adapter over the document store and the
//! stateless manipulator applied to every upload.
use crate::error::AppError;
use crate::storage::DocumentStore;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// An uploaded photo binary plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    /// Original filename as submitted by the client
    pub filename: String,
    /// MIME content type
    pub content_type: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

/// Stateless transformation applied to uploaded photos. Opaque collaborator:
/// callers only see bytes in, bytes out.
pub trait PhotoManipulator: Send + Sync {
    fn manipulate(&self, photo: Photo) -> Result<Photo, AppError>;
}

/// The shipping manipulator. Sniffs the image container from its magic
/// bytes, normalizes the content type accordingly, and rejects payloads
/// that are not recognizable images.
pub struct DogePhotoManipulator;

impl DogePhotoManipulator {
    fn sniff(bytes: &[u8]) -> Option<&'static str> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some("image/png")
        } else if bytes.starts_with(b"\xff\xd8\xff") {
            Some("image/jpeg")
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some("image/gif")
        } else {
            None
        }
    }
}

impl PhotoManipulator for DogePhotoManipulator {
    fn manipulate(&self, photo: Photo) -> Result<Photo, AppError> {
        let content_type = Self::sniff(&photo.bytes)
            .ok_or_else(|| AppError::InvalidInput("unrecognized image format".to_string()))?;
        Ok(Photo {
            content_type: content_type.to_string(),
            ..photo
        })
    }
}

/// Scopes binary reads/writes to a named partition of the store. Every call
/// is a direct pass-through; metadata rides in a `<folder>.files` collection
/// next to the blobs.
pub struct PhotoFolder<S> {
    store: Arc<S>,
    name: String,
}

impl<S: DocumentStore> PhotoFolder<S> {
    /// The `folder(name)` operation of the photo store adapter
    pub fn new(store: Arc<S>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn files_collection(&self) -> String {
        format!("{}.files", self.name)
    }

    /// Store a photo and hand back its generated id
    pub async fn put(&self, photo: &Photo) -> Result<String, AppError> {
        let id = Uuid::new_v4().to_string();
        self.store.put_blob(&self.name, &id, &photo.bytes).await?;
        let metadata = json!({
            "id": id,
            "filename": photo.filename,
            "content_type": photo.content_type,
            "length": photo.bytes.len(),
        });
        self.store
            .put_document(&self.files_collection(), &id, &metadata)
            .await?;
        Ok(id)
    }

    /// Read a stored photo back, bytes plus metadata
    pub async fn get(&self, id: &str) -> Result<Photo, AppError> {
        let metadata = self
            .store
            .get_document(&self.files_collection(), id)
            .await?
            .ok_or(AppError::PhotoNotFound)?;
        let bytes = self.store.get_blob(&self.name, id).await?;
        Ok(Photo {
            filename: metadata["filename"].as_str().unwrap_or_default().to_string(),
            content_type: metadata["content_type"]
                .as_str()
                .unwrap_or("application/octet-stream")
                .to_string(),
            bytes,
        })
    }
}
