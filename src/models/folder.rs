//! Represents a song folder as reconstructed from the remote store listing.

use serde::Serialize;
use serde_json::Value;

/// A folder directly beneath the library root.
///
/// Folders are never persisted locally; they are rebuilt from the remote
/// listing on every request.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Folder {
    /// Path of the folder relative to the root prefix.
    pub name: String,

    /// Parsed metadata blob of the first object seen in this folder.
    pub metadata: Value,

    /// Audio files in listing order.
    pub audio_files: Vec<AudioFile>,
}

/// A playable audio file inside a folder.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct AudioFile {
    /// Display name (basename of the stored object).
    pub name: String,

    /// Playback URL with the transcoding directive applied.
    pub url: String,
}
