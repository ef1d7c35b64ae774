use std::path::PathBuf;
use thiserror::Error;

/// Failure to open a playlist selected by the user. These are the only
/// errors that ever become user-visible text.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("playlist not found: {0}")]
    NotFound(PathBuf),

    #[error("not a playlist file: {0}")]
    UnsupportedExtension(PathBuf),

    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// Status-bar text for this failure.
    pub fn status_text(&self) -> String {
        match self {
            LoadError::NotFound(_) | LoadError::UnsupportedExtension(_) => {
                "Error: Archivo no válido".to_string()
            }
            LoadError::Unreadable { source, .. } => {
                format!("Error al cargar playlist: {}", source)
            }
        }
    }
}

/// Why a logo fetch produced no icon. Recovered inside the worker; never
/// leaves the background context.
#[derive(Debug, Error)]
pub enum FetchSkip {
    #[error("channel has no logo")]
    NoLogo,

    #[error("channel name {0:?} has no usable cache key")]
    UnusableName(String),

    #[error("unsupported logo url scheme: {0}")]
    UnsupportedScheme(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {0}")]
    Status(u16),

    #[error("payload is not a PNG, JPEG or GIF image")]
    NotAnImage,

    #[error("cache write failed: {0}")]
    Io(#[from] std::io::Error),
}
