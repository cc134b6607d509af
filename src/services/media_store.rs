//! The seam between the song library and the hosted media store.

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

use crate::models::resource::{AssetUpload, ListQuery, RemoteResource, UploadedAsset};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("unexpected reply from media store: {0}")]
    Malformed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Remote object store holding every song folder.
///
/// Implementations talk to the network; nothing is cached locally.
#[async_trait]
#[automock]
pub trait MediaStore: Send + Sync {
    /// List stored audio objects whose key starts with `query.prefix`.
    async fn list_resources(&self, query: ListQuery) -> StoreResult<Vec<RemoteResource>>;

    /// Upload one audio object, overwriting whatever sits at its key.
    async fn upload(&self, asset: AssetUpload) -> StoreResult<UploadedAsset>;
}
