//! Represents an incoming song upload and its reply.

use bytes::Bytes;
use serde::Serialize;

/// Form fields of `POST /api/upload`, validated but not yet sanitized.
#[derive(Clone, Debug, Default)]
pub struct UploadRequest {
    pub folder_name: Option<String>,

    /// JSON-encoded metadata; `"{}"` when the form omits it.
    pub metadata: String,

    pub instrumental: Option<AudioPayload>,
    pub full: Option<AudioPayload>,
}

/// One binary part of the upload form.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPayload {
    /// Filename as sent by the client.
    pub filename: String,
    pub data: Bytes,
}

/// Success envelope for a completed upload.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct UploadResponse {
    pub success: bool,
    pub folder: String,

    /// Secure URLs in the order `[instrumental, full]`.
    pub files: Vec<String>,
}
