//! Backend error types
//!
//! Backend failures are fatal for the call that hit them: the engine never
//! retries and never swallows them. A checksum mismatch on load is treated
//! as corruption, not as a recoverable read failure.

use thiserror::Error;

/// Result type for repository operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Persistence collaborator failures
#[derive(Debug, Error)]
pub enum BackendError {
    /// No backing file with this id
    #[error("file {0} not found in repository")]
    NotFound(i64),

    /// Disk I/O failure
    #[error("I/O failure {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored bytes fail their integrity check
    #[error("file {file_id} is corrupt: {reason}")]
    Corrupt { file_id: i64, reason: String },

    /// Payload (de)serialization failure
    #[error("encoding failure: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl BackendError {
    /// Create an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a corruption error
    pub fn corrupt(file_id: i64, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            file_id,
            reason: reason.into(),
        }
    }

    /// Stable string code for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "GRID_FILE_NOT_FOUND",
            Self::Io { .. } => "GRID_IO_ERROR",
            Self::Corrupt { .. } => "GRID_DATA_CORRUPTION",
            Self::Encoding(_) => "GRID_ENCODING_ERROR",
        }
    }
}
