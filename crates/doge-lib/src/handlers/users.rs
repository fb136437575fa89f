// ============================
// doge-lib/src/handlers/users.rs
// ============================
//! User listing.
use crate::error::AppError;
use crate::storage::DocumentStore;
use crate::users::User;
use crate::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// `GET /users` — every user currently in the store
pub async fn list_users<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = state.users.find_all().await?;
    Ok(Json(users))
}
