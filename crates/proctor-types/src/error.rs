// ─────────────────────────────────────────────────────────────────────
// Proctor Kernel — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all Proctor Kernel failures.
///
/// None of these ever reach the exam host as a blocking failure: the
/// monitor logs them and degrades instead.
#[derive(Error, Debug)]
pub enum ProctorError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Invalid input (identity, parameters).
    #[error("validation error: {0}")]
    Validation(String),

    /// Camera unavailable, detector failed to load, or a frame failed.
    #[error("sensing error: {0}")]
    Sensing(String),

    /// Audit store write failed.
    #[error("audit error: {0}")]
    Audit(String),

    /// Releasing a resource failed (stream already stopped, etc.).
    #[error("teardown error: {0}")]
    Teardown(String),

    /// Record could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ProctorResult<T> = Result<T, ProctorError>;
