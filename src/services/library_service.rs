//! LibraryService: folder listing and song upload on top of a `MediaStore`.
//! A folder is the parent path of an object below `root_folder` (uploads
//! create one level, nested ids keep their full parent path); the remote
//! store is the only source of truth, nothing is kept in-process.

use crate::{
    models::{
        folder::{AudioFile, Folder},
        resource::{AssetUpload, ListQuery, RemoteResource},
        upload::{AudioPayload, UploadRequest, UploadResponse},
    },
    services::media_store::{MediaStore, StoreError},
};
use serde_json::{Value, json};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tracing::{info, warn};
use unicode_normalization::UnicodeNormalization;

/// Upper bound the store accepts for a single listing page.
pub const MAX_LISTED_RESOURCES: u32 = 500;

const UPLOAD_SEGMENT: &str = "/upload/";
const TRANSCODE_DIRECTIVE: &str = "ac_mp3,br_128k";

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Missing folder name")]
    MissingFolderName,
    #[error("Missing audio files")]
    MissingAudioFiles,
    #[error("Invalid file name `{0}`")]
    InvalidFileName(String),
    #[error("resource `{0}` has no secure URL")]
    MissingUrl(String),
    #[error("URL `{0}` has no `/upload/` segment")]
    MalformedUrl(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Upload failed: {0}")]
    Upload(#[source] StoreError),
}

impl LibraryError {
    /// Validation failures are the caller's fault and never reach the store.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LibraryError::MissingFolderName
                | LibraryError::MissingAudioFiles
                | LibraryError::InvalidFileName(_)
        )
    }
}

pub type LibraryResult<T> = Result<T, LibraryError>;

/// Shared request state: a handle to the remote store plus the root prefix.
#[derive(Clone)]
pub struct LibraryService {
    pub store: Arc<dyn MediaStore>,
    pub root_folder: String,
}

impl LibraryService {
    pub fn new(store: Arc<dyn MediaStore>, root_folder: impl Into<String>) -> Self {
        Self {
            store,
            root_folder: root_folder.into(),
        }
    }

    /// List every folder under the root with its metadata and playable files.
    ///
    /// Any fault aborts the whole listing; no partial results are returned.
    pub async fn list_folders(&self) -> LibraryResult<Vec<Folder>> {
        let resources = self
            .store
            .list_resources(ListQuery {
                prefix: self.root_folder.clone(),
                max_results: MAX_LISTED_RESOURCES,
            })
            .await?;

        group_folders(&self.root_folder, &resources)
    }

    /// Validate the form, then upload instrumental and full mix in that order.
    ///
    /// Validation happens before any store call. If the first upload succeeds
    /// and the second fails, the first object stays in the store.
    pub async fn upload_song(&self, request: UploadRequest) -> LibraryResult<UploadResponse> {
        let folder = request
            .folder_name
            .filter(|name| !name.trim().is_empty())
            .ok_or(LibraryError::MissingFolderName)?;
        let (instrumental, full) = match (request.instrumental, request.full) {
            (Some(inst), Some(full)) => (inst, full),
            _ => return Err(LibraryError::MissingAudioFiles),
        };

        let inst_key = self.key_for(&folder, &instrumental)?;
        let full_key = self.key_for(&folder, &full)?;

        let mut files = Vec::with_capacity(2);
        for (public_id, payload) in [(inst_key, instrumental), (full_key, full)] {
            let uploaded = self
                .store
                .upload(AssetUpload {
                    public_id: public_id.clone(),
                    filename: payload.filename,
                    data: payload.data,
                    metadata: request.metadata.clone(),
                    overwrite: true,
                })
                .await
                .map_err(|err| {
                    if !files.is_empty() {
                        warn!(%folder, orphaned = ?files, "second upload failed after the first succeeded");
                    }
                    LibraryError::Upload(err)
                })?;

            info!(%public_id, stored_as = %uploaded.public_id, url = %uploaded.secure_url, "uploaded audio file");
            files.push(uploaded.secure_url);
        }

        Ok(UploadResponse {
            success: true,
            folder,
            files,
        })
    }

    fn key_for(&self, folder: &str, payload: &AudioPayload) -> LibraryResult<String> {
        let sanitized = sanitize_filename(&payload.filename);
        let base = strip_extension(&sanitized);
        if base.is_empty() {
            return Err(LibraryError::InvalidFileName(payload.filename.clone()));
        }
        Ok(storage_key(&self.root_folder, folder, base))
    }
}

/// Fold listed resources into folders.
///
/// Folder order and file order follow the listing. The first resource seen
/// for a folder supplies its metadata; later ones never replace it.
pub fn group_folders(root: &str, resources: &[RemoteResource]) -> LibraryResult<Vec<Folder>> {
    let mut folders: Vec<Folder> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for res in resources {
        let Some((folder_name, file_name)) = split_relative(root, &res.public_id) else {
            continue;
        };

        let url = res
            .secure_url
            .as_deref()
            .ok_or_else(|| LibraryError::MissingUrl(res.public_id.clone()))?;
        let audio = AudioFile {
            name: file_name.to_string(),
            url: transcode_url(url)?,
        };

        let slot = match index.get(folder_name) {
            Some(&slot) => slot,
            None => {
                folders.push(Folder {
                    name: folder_name.to_string(),
                    metadata: parse_metadata(folder_name, res.metadata()),
                    audio_files: Vec::new(),
                });
                index.insert(folder_name.to_string(), folders.len() - 1);
                folders.len() - 1
            }
        };
        folders[slot].audio_files.push(audio);
    }

    Ok(folders)
}

/// Split a public id into `(folder, basename)` relative to `root`.
///
/// Returns `None` for ids outside the root and for objects sitting directly
/// at the root.
fn split_relative<'a>(root: &str, public_id: &'a str) -> Option<(&'a str, &'a str)> {
    let relative = public_id.strip_prefix(root)?.strip_prefix('/')?;
    let (folder, file) = relative.rsplit_once('/')?;
    if folder.is_empty() {
        return None;
    }
    Some((folder, file))
}

/// Parse a folder's metadata string; anything but a JSON object is invalid.
fn parse_metadata(folder: &str, raw: Option<&str>) -> Value {
    match serde_json::from_str::<Value>(raw.unwrap_or("{}")) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            warn!(%folder, "metadata is not a JSON object: {}", other);
            json!({ "error": "invalid metadata" })
        }
        Err(err) => {
            warn!(%folder, "JSON parse error: {}", err);
            json!({ "error": "invalid metadata" })
        }
    }
}

/// Insert the MP3/128k transcoding directive right after the first `/upload/`.
pub fn transcode_url(url: &str) -> LibraryResult<String> {
    let (head, tail) = url
        .split_once(UPLOAD_SEGMENT)
        .ok_or_else(|| LibraryError::MalformedUrl(url.to_string()))?;
    Ok(format!(
        "{}{}{}/{}",
        head, UPLOAD_SEGMENT, TRANSCODE_DIRECTIVE, tail
    ))
}

/// Make a client filename safe to use as a storage key segment.
///
/// Characters are NFKD-decomposed and whatever is left outside ASCII is
/// dropped (`é` -> `e`), whitespace runs and path separators
/// become `_`, anything outside `[A-Za-z0-9_.-]` is removed and leading or
/// trailing `.`/`_` are trimmed.
pub fn sanitize_filename(name: &str) -> String {
    let ascii: String = name
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Drop the last extension (`a.b.mp3` -> `a.b`); a leading dot is not an extension.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(pos) if pos > 0 => &name[..pos],
        _ => name,
    }
}

pub fn storage_key(root: &str, folder: &str, base_name: &str) -> String {
    format!("{}/{}/{}", root, folder, base_name)
}
