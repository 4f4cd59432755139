//! Domain-specific error types following panic-free policy.

use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Snapshot payload could not be interpreted. The whole snapshot is discarded.
    #[error("Malformed snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    /// A batch action was requested with nothing selected
    #[error("No processes selected")]
    EmptySelection,

    /// None of the requested processes exist in the current snapshot
    #[error("None of the {requested} selected process(es) are still running")]
    NoLiveTargets { requested: usize },

    /// Query text was empty after trimming
    #[error("Query is empty")]
    EmptyQuery,

    /// Invalid field value
    #[error("Invalid {field}: {value} (expected {expected})")]
    InvalidFieldValue {
        field: String,
        value: String,
        expected: String,
    },
}

impl DomainError {
    /// Shorthand for a malformed snapshot error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedSnapshot {
            reason: reason.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = DomainError::malformed("payload is not a list");
        assert_eq!(err.to_string(), "Malformed snapshot: payload is not a list");
    }

    #[test]
    fn test_no_live_targets_display() {
        let err = DomainError::NoLiveTargets { requested: 3 };
        assert!(err.to_string().contains("3 selected"));
    }
}
