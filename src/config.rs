use anyhow::{Context, Result};
use clap::Parser;
use std::{env, fmt};

const DEFAULT_ROOT_FOLDER: &str = "song-library";
const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";

/// Centralized application configuration.
/// Combines environment variables (optionally loaded from `.env`) and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
    pub max_upload_mb: usize,
    pub root_folder: String,
    pub cloudinary: CloudinaryCredentials,
}

/// Account credentials for the remote media store.
#[derive(Clone)]
pub struct CloudinaryCredentials {
    pub api_base: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Song library API backed by Cloudinary")]
pub struct Args {
    /// Host to bind to (overrides SONG_LIBRARY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides SONG_LIBRARY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding the landing page (overrides SONG_LIBRARY_STATIC_DIR)
    #[arg(long)]
    pub static_dir: Option<String>,

    /// Request body limit in MiB (overrides SONG_LIBRARY_MAX_UPLOAD_MB)
    #[arg(long)]
    pub max_upload_mb: Option<usize>,

    /// Root folder all songs live under (overrides SONG_LIBRARY_ROOT_FOLDER)
    #[arg(long)]
    pub root_folder: Option<String>,

    /// Cloudinary API base URL (overrides CLOUDINARY_API_BASE)
    #[arg(long)]
    pub api_base: Option<String>,
}

impl AppConfig {
    /// Parse `.env`, environment variables and CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        dotenvy::dotenv().ok();
        let args = Args::parse();
        Self::from_sources(args, |name| env::var(name))
    }

    /// Merge CLI args over values produced by `lookup` (normally `std::env::var`).
    pub fn from_sources<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let var_or = |name: &str, default: &str| lookup(name).unwrap_or_else(|_| default.into());
        let required = |name: &str| {
            lookup(name)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .with_context(|| format!("{} must be set", name))
        };

        // --- Environment fallback ---
        let env_port = match lookup("SONG_LIBRARY_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing SONG_LIBRARY_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 5000,
            Err(err) => return Err(err).context("reading SONG_LIBRARY_PORT"),
        };
        let env_upload_mb = match lookup("SONG_LIBRARY_MAX_UPLOAD_MB") {
            Ok(value) => value
                .parse::<usize>()
                .with_context(|| format!("parsing SONG_LIBRARY_MAX_UPLOAD_MB value `{}`", value))?,
            Err(env::VarError::NotPresent) => 100,
            Err(err) => return Err(err).context("reading SONG_LIBRARY_MAX_UPLOAD_MB"),
        };

        let cloudinary = CloudinaryCredentials {
            api_base: args
                .api_base
                .unwrap_or_else(|| var_or("CLOUDINARY_API_BASE", DEFAULT_API_BASE)),
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            api_key: required("CLOUDINARY_API_KEY")?,
            api_secret: required("CLOUDINARY_API_SECRET")?,
        };

        // --- Merge ---
        let root_folder = args
            .root_folder
            .unwrap_or_else(|| var_or("SONG_LIBRARY_ROOT_FOLDER", DEFAULT_ROOT_FOLDER))
            .trim_matches('/')
            .to_string();
        if root_folder.is_empty() {
            anyhow::bail!("root folder must not be empty");
        }

        Ok(Self {
            host: args
                .host
                .unwrap_or_else(|| var_or("SONG_LIBRARY_HOST", "0.0.0.0")),
            port: args.port.unwrap_or(env_port),
            static_dir: args
                .static_dir
                .unwrap_or_else(|| var_or("SONG_LIBRARY_STATIC_DIR", "./static")),
            max_upload_mb: args.max_upload_mb.unwrap_or(env_upload_mb),
            root_folder,
            cloudinary,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("static_dir", &self.static_dir)
            .field("max_upload_mb", &self.max_upload_mb)
            .field("root_folder", &self.root_folder)
            .field("cloudinary", &self.cloudinary)
            .finish()
    }
}

impl fmt::Debug for CloudinaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryCredentials")
            .field("api_base", &self.api_base)
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}
