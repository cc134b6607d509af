//! `GET /api/folders` — song folders rebuilt from the remote store.

use crate::{errors::AppError, models::folder::Folder, services::library_service::LibraryService};
use axum::{Json, extract::State};

/// List all folders under the library root.
///
/// Any failure yields `500 {"error": ...}`; partial listings are never returned.
pub async fn list_folders(
    State(service): State<LibraryService>,
) -> Result<Json<Vec<Folder>>, AppError> {
    let folders = service.list_folders().await.map_err(|err| {
        tracing::error!("Error listing folders: {}", err);
        AppError::internal(err.to_string())
    })?;

    tracing::debug!(count = folders.len(), "listed folders");
    Ok(Json(folders))
}
