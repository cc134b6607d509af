//! Core data models for the song library.
//!
//! `folder` and `upload` are what the HTTP API speaks; `resource` mirrors the
//! remote media store's wire format.

pub mod folder;
pub mod resource;
pub mod upload;
