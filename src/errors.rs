//! Error types shared by the runtime manager, workers, and file gating.

use thiserror::Error;

use crate::execution::protocol::ProtocolError;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Could not start the Python worker: {0}")]
    Spawn(String),
    #[error("Worker transport failed: {0}")]
    Transport(String),
    #[error("A run is already in progress")]
    RunInFlight,
    #[error("Execution context is not ready")]
    NotReady,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

// Rejections raised before anything reaches the worker.
#[derive(Error, Debug)]
pub enum FileRejected {
    #[error("Unsupported file type: .{0} (only .py and .txt files are accepted)")]
    UnsupportedExtension(String),
    #[error("File is too large: {size} bytes (limit is {limit} bytes)")]
    TooLarge { size: u64, limit: u64 },
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
