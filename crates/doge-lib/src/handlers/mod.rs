// ============================
// doge-lib/src/handlers/mod.rs
// ============================
//! HTTP surface: views, user listing, photo upload/fetch, health.
pub mod photos;
pub mod users;
pub mod views;

use crate::storage::DocumentStore;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Assemble the HTTP router. The multipart body limit applies only to the
/// upload route, before any handler code runs.
pub fn http_router<S: DocumentStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let upload_limit = state.settings.max_upload_bytes;

    Router::new()
        .route("/client", get(views::client))
        .route("/monitor", get(views::monitor))
        .route("/users", get(users::list_users))
        .route(
            "/users/{username}/doge",
            axum::routing::post(photos::upload_photo)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/users/{username}/doge/{photo_id}", get(photos::get_photo))
        .route("/health", get(health))
        .with_state(state)
}

/// `GET /health` — surfaces the store health indicator
async fn health<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    let health = state.health.check().await;
    let status = match health {
        crate::health::Health::Ok => StatusCode::OK,
        crate::health::Health::Error => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(json!({ "status": health })))
}
