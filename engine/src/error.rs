//! Error types for the Baler engine.

use crate::RecordId;
use thiserror::Error;

/// All possible errors from the Baler engine.
#[derive(Debug, Error)]
pub enum Error {
    // Validation errors
    #[error("record already exists: {0}")]
    DuplicateId(RecordId),

    #[error("record not found: {0}")]
    NotFound(RecordId),

    #[error("invalid transaction: {0}")]
    Validation(String),

    #[error("unknown material: {0}")]
    UnknownMaterial(String),

    // Persistence errors
    #[error("storage failure: {0}")]
    Storage(String),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
