use anyhow::Result;
use axum::Router;
use std::{io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{cloudinary::CloudinaryClient, library_service::LibraryService};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting song-library with config: {:?}", cfg);

    let index = Path::new(&cfg.static_dir).join("index.html");
    if !index.exists() {
        tracing::warn!("Landing page {} not found; `/` will answer 404", index.display());
    }

    // --- Initialize remote store + core service ---
    let store = CloudinaryClient::new(cfg.cloudinary.clone())?;
    let library = LibraryService::new(Arc::new(store), cfg.root_folder.clone());

    // --- Build router ---
    let app: Router =
        routes::routes::routes(&cfg.static_dir, cfg.body_limit_bytes()).with_state(library);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received ctrl+C signal, shutting down");
}
