//! `POST /api/upload` — forwards an instrumental/full pair to the remote store.

use crate::{
    errors::AppError,
    models::upload::{AudioPayload, UploadRequest, UploadResponse},
    services::library_service::LibraryService,
};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};

/// Upload both audio parts of a song into `folder_name`.
///
/// Form fields: `folder_name`, optional `metadata` (JSON text, default `{}`),
/// file parts `instrumental` and `full`. Unknown parts are ignored.
pub async fn upload_song(
    State(service): State<LibraryService>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let request = read_upload_form(multipart?).await?;

    let response = service.upload_song(request).await.map_err(|err| {
        if err.is_validation() {
            tracing::debug!("Rejected upload: {}", err);
        } else {
            tracing::error!("Error on upload: {}", err);
        }
        AppError::from(err)
    })?;

    Ok(Json(response))
}

/// Drain the multipart body into an `UploadRequest`.
///
/// A file part without a filename is treated as absent.
async fn read_upload_form(mut multipart: Multipart) -> Result<UploadRequest, AppError> {
    let mut request = UploadRequest {
        metadata: "{}".into(),
        ..UploadRequest::default()
    };

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "folder_name" => request.folder_name = Some(field.text().await?),
            "metadata" => request.metadata = field.text().await?,
            "instrumental" | "full" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                if filename.is_empty() {
                    continue;
                }

                let payload = Some(AudioPayload { filename, data });
                if name == "instrumental" {
                    request.instrumental = payload;
                } else {
                    request.full = payload;
                }
            }
            other => tracing::debug!(field = %other, "ignoring unknown form field"),
        }
    }

    Ok(request)
}
