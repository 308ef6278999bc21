/// Structured error types for salesctl-core.
///
/// Every failure a report can produce falls into one of three buckets:
/// bad input (detected before anything is sent to the warehouse), a
/// warehouse failure, or a misconfigured template. The HTTP layer maps
/// them to status codes; the binary wraps them in `anyhow`.
use thiserror::Error;

/// Main error type for query building and execution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Malformed or contradictory request input
    #[error("invalid parameter '{field}': {reason}")]
    InvalidParameter { field: String, reason: String },

    /// The warehouse rejected the query or could not be reached
    #[error("query execution failed: {message}")]
    ExecutionFailure { message: String },

    /// Template and filters disagree (unknown region, unbound placeholder, ...)
    #[error("query template error: {reason}")]
    Template { reason: String },
}

/// Result type alias for salesctl-core operations
pub type Result<T> = std::result::Result<T, QueryError>;

impl QueryError {
    /// Create an invalid parameter error
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an execution failure carrying the warehouse's message
    pub fn execution(message: impl Into<String>) -> Self {
        Self::ExecutionFailure {
            message: message.into(),
        }
    }

    /// Create a template error
    pub fn template(reason: impl Into<String>) -> Self {
        Self::Template {
            reason: reason.into(),
        }
    }

    /// True when the error was raised before any warehouse round trip
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }
}
