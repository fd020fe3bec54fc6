//! Crate-wide error types
//!
//! Four categories, matching how a call can fail:
//! - `Usage` — caller bug (uninitialized table, bad indices, unknown key);
//!   never retried.
//! - `Validation` — a supplied value violates a column constraint; raised at
//!   write time, not at schema declaration time.
//! - `PermissionDenied` — the access guard rejected the call before any
//!   state change.
//! - `Backend` — the persistence collaborator failed; fatal for the call.
//!
//! Guard and validation checks run fully before any mutation, so a failed
//! call leaves stored state byte-identical to before the call.

use std::fmt;

use thiserror::Error;

use crate::backend::BackendError;

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;

/// Unified error type for the table engine
#[derive(Debug, Error)]
pub enum TableError {
    /// Caller misused the API
    #[error("usage error: {0}")]
    Usage(String),

    /// A value violates its column's declared constraint
    #[error("validation failed: {0}")]
    Validation(ValidationDetails),

    /// The caller lacks the required access for this operation
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The persistence backend failed
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl TableError {
    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a permission-denied error
    pub fn denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Stable string code for logs and remote surfaces
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usage(_) => "GRID_USAGE_ERROR",
            Self::Validation(_) => "GRID_VALIDATION_FAILED",
            Self::PermissionDenied(_) => "GRID_PERMISSION_DENIED",
            Self::Backend(_) => "GRID_BACKEND_ERROR",
        }
    }
}

/// Validation failure details
#[derive(Debug, Clone)]
pub struct ValidationDetails {
    /// Column the offending value was supplied for
    pub column: String,
    /// Expected constraint
    pub expected: String,
    /// Actual value or shape found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(
        column: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn string_too_long(column: impl Into<String>, max: usize, got: usize) -> Self {
        Self {
            column: column.into(),
            expected: format!("string of at most {} characters", max),
            actual: format!("string of {} characters", got),
        }
    }

    pub fn width_mismatch(column: impl Into<String>, width: usize, got: usize) -> Self {
        Self {
            column: column.into(),
            expected: format!("array of exactly {} elements", width),
            actual: format!("array of {} elements", got),
        }
    }

    pub fn kind_mismatch(
        column: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "column '{}': expected {}, got {}",
            self.column, self.expected, self.actual
        )
    }
}

impl From<ValidationDetails> for TableError {
    fn from(details: ValidationDetails) -> Self {
        TableError::Validation(details)
    }
}
