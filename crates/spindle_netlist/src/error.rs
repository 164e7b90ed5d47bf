//! Netlist construction and serialization errors.

use thiserror::Error;

/// Errors raised while building or saving a netlist.
#[derive(Debug, Error)]
pub enum NetlistError {
    /// A logical operator name had no registered generator.
    #[error("no generator registered for operator `{0}`")]
    UnknownGenerator(String),

    /// A wire path referenced an instance that has been removed.
    #[error("wire references removed instance `{0}`")]
    RemovedInstance(String),

    /// Writing an artifact file failed.
    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("failed to serialize design: {0}")]
    Json(#[from] serde_json::Error),
}
