//! Error types raised while loading levels and maps.

use std::path::PathBuf;

use thiserror::Error;

/// Why a level or map could not be loaded. The world is left untouched
/// whenever one of these is returned.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("map {0} contains no rows")]
    EmptyMap(String),

    #[error("unsupported map format {0}")]
    UnsupportedFormat(i64),

    #[error("unsupported level file: {0}")]
    UnsupportedFile(String),

    #[error("unresolvable reference {0}")]
    Reference(String),
}

pub type Result<T> = std::result::Result<T, LoadError>;
