use std::path::PathBuf;

use ml::ConfigError;
use thiserror::Error;

/// Failure to persist or restore a checkpoint. Never fatal during a run.
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("checkpoint storage at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("checkpoint metadata: {0}")]
    Format(#[from] serde_json::Error),
    #[error("agent parameters at {}: {message}", .path.display())]
    Agent { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum TrainError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot resume: {0}")]
    Resume(#[from] CheckpointError),
}
