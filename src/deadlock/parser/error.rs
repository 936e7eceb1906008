//! Parser error types for deadlock analysis

use thiserror::Error;

/// Errors that can occur while turning a diagnostic message into a model.
///
/// Extraction itself is best-effort and leaves missing fields absent; these
/// variants cover the failures that invalidate the whole parse.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("lock record references unknown process {0}")]
    UnknownProcess(u32),

    #[error("inconsistent model: {0}")]
    CorruptModel(String),
}

/// Result type alias for parser operations
pub type ParseResult<T> = Result<T, ParseError>;
