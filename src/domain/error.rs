// ============================================================
// Layer 3 — Recommender Errors
// ============================================================
// Every failure the core can report to its caller.
//
//   Validation — bad input record or bad configuration,
//                raised before any training step begins
//   State      — operation called in the wrong engine state
//                (e.g. infer before fit/load)
//   Storage    — persisted artifact missing, partial or unreadable
//   Training   — non-finite loss or a tensor read-back failure
//
// Unknown user/item ids at inference time are NOT errors:
// they resolve through the OOV embedding slot.
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Recoverable Errors with Result)

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecsysError {
    /// A record or configuration value failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The engine is not in a state that allows the operation.
    #[error("state error: {0}")]
    State(String),

    /// A persisted artifact could not be written or restored.
    #[error("storage error: {0}")]
    Storage(String),

    /// Training produced an unusable model.
    #[error("training error: {0}")]
    Training(String),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RecsysError {
    /// True for the storage family (explicit storage errors, I/O, JSON).
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_) | Self::Json(_))
    }
}

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, RecsysError>;
