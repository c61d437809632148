//! Error types for the classification core.
//!
//! This module defines the error types that can occur while classifying a
//! page, including configuration errors raised at pipeline construction,
//! invalid input data, and candidate build failures. It also provides
//! utility constructors for creating these errors with appropriate context.

use thiserror::Error;

use crate::classifier::candidate::CandidateId;

/// Convenient result alias for classification operations.
pub type ClassifyResult<T> = Result<T, ClassifyError>;

/// Enum representing the errors that can occur in the classification core.
///
/// Configuration errors are fatal and raised at pipeline construction.
/// Build failures are recoverable: the driver excludes the failing
/// candidate and re-solves (bounded by the retry budget).
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error indicating invalid input data.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// A selected candidate could not be materialized into an element.
    ///
    /// The solver treats this as an infeasibility for the candidate and
    /// re-solves with its selection forbidden.
    #[error("build failed for candidate {candidate:?}: {reason}")]
    BuildFailed {
        /// The candidate whose construction failed.
        candidate: CandidateId,
        /// Why construction failed.
        reason: String,
    },

    /// The constraint model admitted no feasible selection.
    #[error("constraint model is infeasible")]
    Infeasible,

    /// Error from serialization or deserialization of results.
    #[error("serialization")]
    Serialization(#[from] serde_json::Error),
}

impl ClassifyError {
    /// Creates a ClassifyError for configuration errors.
    ///
    /// # Arguments
    ///
    /// * `message` - A message describing the configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates a ClassifyError for configuration errors with field context.
    ///
    /// # Arguments
    ///
    /// * `field` - The field where the error occurred.
    /// * `value` - The value of the field.
    /// * `reason` - The reason for the error.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::ConfigError {
            message: format!(
                "configuration error in field '{}' with value '{}': {}",
                field, value, reason
            ),
        }
    }

    /// Creates a ClassifyError for invalid input.
    ///
    /// # Arguments
    ///
    /// * `message` - A message describing the invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a ClassifyError for a candidate build failure.
    ///
    /// # Arguments
    ///
    /// * `candidate` - The candidate whose construction failed.
    /// * `reason` - Why construction failed.
    pub fn build_failed(candidate: CandidateId, reason: impl Into<String>) -> Self {
        Self::BuildFailed {
            candidate,
            reason: reason.into(),
        }
    }

    /// Returns the failing candidate if this is a build failure.
    pub fn failed_candidate(&self) -> Option<CandidateId> {
        match self {
            Self::BuildFailed { candidate, .. } => Some(*candidate),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = ClassifyError::config_error("missing classifier for 'step'");
        assert_eq!(
            err.to_string(),
            "configuration: missing classifier for 'step'"
        );
    }

    #[test]
    fn test_config_error_with_context() {
        let err = ClassifyError::config_error_with_context(
            "unconsumed_penalty",
            "-3",
            "must be non-negative",
        );
        assert!(err.to_string().contains("unconsumed_penalty"));
        assert!(err.to_string().contains("must be non-negative"));
    }

    #[test]
    fn test_build_failed_carries_candidate() {
        let err = ClassifyError::build_failed(CandidateId(7), "child not selected");
        assert_eq!(err.failed_candidate(), Some(CandidateId(7)));
        assert_eq!(ClassifyError::config_error("x").failed_candidate(), None);
    }
}
