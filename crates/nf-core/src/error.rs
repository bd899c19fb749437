//! Error types for NoiseForge

use thiserror::Error;

/// Core error type
///
/// Numeric out-of-range values are clamped rather than rejected, so they
/// never appear here; `BadParameter` is reserved for unknown enum values
/// and parameter keys a filter variant does not own.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NfError {
    /// Host lacks required audio capabilities; fatal at initialization
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Operation requires completed initialization
    #[error("Engine not initialized")]
    NotInitialized,

    /// Nonexistent track or filter index
    #[error("Bad index: {0}")]
    BadIndex(usize),

    /// Unknown enum value or parameter key
    #[error("Bad parameter: {0}")]
    BadParameter(String),

    /// Worker failed to come online within the init timeout
    #[error("Worker {0} failed to initialize within {1} ms")]
    WorkerInitTimeout(usize, u64),

    /// A chunk failed on a worker after exhausting retries
    #[error("Chunk {chunk} failed after {attempts} attempts: {reason}")]
    WorkerJobFailed {
        chunk: usize,
        attempts: u32,
        reason: String,
    },

    /// Offline render observed a cancellation request
    #[error("Render cancelled")]
    Cancelled,

    /// Precondition violated; should be unreachable
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type NfResult<T> = Result<T, NfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NfError::BadIndex(7);
        assert_eq!(err.to_string(), "Bad index: 7");

        let err = NfError::WorkerJobFailed {
            chunk: 3,
            attempts: 3,
            reason: "panic".into(),
        };
        assert!(err.to_string().contains("Chunk 3"));
    }
}
