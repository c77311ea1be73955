use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by configuration, asset and platform setup.
///
/// The per-frame locomotion path never produces these; it sanitizes its
/// inputs instead.
#[derive(Debug, Error)]
pub enum WalkthroughError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to load texture {}: {source}", path.display())]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("pointer capture failed: {0}")]
    Capture(String),

    #[error("gpu init failed: {0}")]
    Gpu(String),
}

pub type Result<T> = std::result::Result<T, WalkthroughError>;

/// Read a whole file, attaching the path to any io error.
pub fn read_to_string(path: impl Into<PathBuf>) -> Result<String> {
    let path = path.into();
    std::fs::read_to_string(&path).map_err(|source| WalkthroughError::Io { path, source })
}
