// ============================
// doge-lib/src/users.rs
// ============================
//! User records and their repository over the document store.
use crate::error::AppError;
use crate::storage::DocumentStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const COLLECTION: &str = "users";

/// A user record. The username uniquely identifies the user; uniqueness is
/// enforced by the store's upsert-by-id semantics, not by this code.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique username, e.g. `philwebb`
    pub username: String,
    /// Human-readable display name
    pub display_name: String,
}

impl User {
    pub fn new(username: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            display_name: display_name.into(),
        }
    }
}

/// Persistence interface over user records
pub struct UserRepository<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> UserRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Upsert a user by username and hand the record back
    pub async fn save(&self, user: User) -> Result<User, AppError> {
        let body = serde_json::to_value(&user)?;
        self.store
            .put_document(COLLECTION, &user.username, &body)
            .await?;
        Ok(user)
    }

    /// Snapshot of all users at call time, unordered
    pub async fn find_all(&self) -> Result<Vec<User>, AppError> {
        let docs = self.store.list_documents(COLLECTION).await?;
        let mut users = Vec::with_capacity(docs.len());
        for doc in docs {
            users.push(serde_json::from_value(doc)?);
        }
        Ok(users)
    }

    /// Look a single user up by username
    pub async fn find_one(&self, username: &str) -> Result<Option<User>, AppError> {
        match self.store.get_document(COLLECTION, username).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }
}
