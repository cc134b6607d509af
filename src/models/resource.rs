//! Wire types exchanged with the remote media store.

use bytes::Bytes;
use serde::Deserialize;

/// One stored object as returned by the resource listing.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RemoteResource {
    /// Full storage key, e.g. `song-library/songA/Track_One`.
    pub public_id: String,

    #[serde(default)]
    pub secure_url: Option<String>,

    #[serde(default)]
    pub context: Option<ResourceContext>,
}

impl RemoteResource {
    /// Raw `context.custom.metadata` string, if the object carries one.
    pub fn metadata(&self) -> Option<&str> {
        self.context
            .as_ref()
            .and_then(|ctx| ctx.custom.as_ref())
            .and_then(|custom| custom.metadata.as_deref())
    }
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ResourceContext {
    #[serde(default)]
    pub custom: Option<CustomContext>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CustomContext {
    #[serde(default)]
    pub metadata: Option<String>,
}

/// Envelope of the resource listing reply.
#[derive(Deserialize, Debug, Default)]
pub struct ResourceList {
    #[serde(default)]
    pub resources: Vec<RemoteResource>,
}

/// Parameters for listing objects under a prefix.
#[derive(Clone, Debug, PartialEq)]
pub struct ListQuery {
    pub prefix: String,
    pub max_results: u32,
}

/// A single object upload.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetUpload {
    /// Target storage key.
    pub public_id: String,

    /// Original filename, forwarded with the payload.
    pub filename: String,

    pub data: Bytes,

    /// Raw metadata string stored as context under `metadata`.
    pub metadata: String,

    pub overwrite: bool,
}

/// Reply of a successful upload.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UploadedAsset {
    #[serde(default)]
    pub public_id: String,

    pub secure_url: String,
}
