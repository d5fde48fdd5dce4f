use std::path::PathBuf;
use thiserror::Error;

/// Errors raised at the crate boundary: loading snapshots and configuration.
///
/// Stage resolution itself has no failure path.
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid recording snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("snapshot directory not found: {0}")]
    MissingDirectory(PathBuf),
}

pub type Result<T> = std::result::Result<T, TimelineError>;
