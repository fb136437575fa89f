// ============================
// doge-lib/src/handlers/photos.rs
// ============================
//! Photo upload and fetch.
use crate::error::AppError;
use crate::metrics as keys;
use crate::photo::Photo;
use crate::storage::DocumentStore;
use crate::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use doge_common::DogePhotoAlert;
use metrics::{counter, histogram};
use serde_json::json;
use std::sync::Arc;

const ALARMS_DESTINATION: &str = "/topic/alarms";

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::InvalidInput(err.to_string())
    }
}

/// `POST /users/{username}/doge` — multipart photo upload.
///
/// Bodies over the configured limit never reach this handler; the body
/// limit layer rejects them with 413 first.
pub async fn upload_photo<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(username): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users
        .find_one(&username)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let mut photo = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("doge").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        photo = Some(Photo {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    let photo = photo.ok_or_else(|| AppError::InvalidInput("missing file field".to_string()))?;

    let photo = state.manipulator.manipulate(photo)?;
    let photo_id = state.photos.put(&photo).await?;

    counter!(keys::PHOTO_UPLOADED).increment(1);
    #[allow(clippy::cast_precision_loss)]
    histogram!(keys::PHOTO_BYTES).record(photo.bytes.len() as f64);
    tracing::info!(user = %user.username, photo_id = %photo_id, "photo stored");

    let alert = DogePhotoAlert {
        user_id: user.username,
        doge_photo_id: photo_id.clone(),
    };
    state
        .broker
        .publish(ALARMS_DESTINATION, serde_json::to_value(&alert)?)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "dogePhotoId": photo_id }))))
}

/// `GET /users/{username}/doge/{photo_id}` — stored photo bytes
pub async fn get_photo<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((username, photo_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .users
        .find_one(&username)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let photo = state.photos.get(&photo_id).await?;
    Ok((
        [(header::CONTENT_TYPE, photo.content_type)],
        photo.bytes,
    ))
}
