//! Defines routes for the song library API.
//!
//! ## Structure
//! - `GET  /api/folders` — list song folders with metadata and playback URLs
//! - `POST /api/upload`  — upload an instrumental/full pair into a folder
//! - `GET  /healthz`     — liveness
//! - `GET  /`            — landing page; other paths fall through to the static directory
//!
//! Anything else answers `404 {"error": "Not Found", "status": "error"}`, and a
//! panicking handler answers `500` with the same envelope.

use crate::{
    errors::{handle_panic, not_found},
    handlers::{
        folder_handlers::list_folders, health_handlers::healthz, upload_handlers::upload_song,
    },
    services::library_service::LibraryService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    http::Method,
    routing::{get, post},
};
use std::path::Path;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

/// Build and return the router for the song library.
///
/// The router carries shared state (`LibraryService`) to all handlers.
/// `body_limit` caps request bodies in bytes; audio uploads need far more
/// than axum's default. Going over it surfaces as a multipart error, so the
/// client still gets a JSON `{"error"}` body.
pub fn routes(static_dir: impl AsRef<Path>, body_limit: usize) -> Router<LibraryService> {
    let static_dir = static_dir.as_ref();
    let static_files = ServeDir::new(static_dir).not_found_service(not_found.into_service());

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/folders", get(list_folders))
        .route("/api/upload", post(upload_song))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any)
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
}
