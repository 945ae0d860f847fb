//! Error types for explanation operations.
//!
//! Every fallible call in the crate returns [`Result`]. Errors surface to the
//! direct caller; nothing in the crate logs an error and carries on.

use thiserror::Error;

/// Main error type for explanation operations.
///
/// # Examples
///
/// ```
/// use explicar::error::ExplicarError;
///
/// let err = ExplicarError::DimensionMismatch {
///     expected: "rows=100".to_string(),
///     actual: "99".to_string(),
/// };
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExplicarError {
    /// Shapes of matrix/vector arguments disagree. Always a caller bug.
    #[error("Matrix dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Rank-deficient or zero-residual-DOF numeric situation that could not
    /// be recovered.
    #[error("Degenerate input: {reason}")]
    DegenerateInput {
        /// What made the input degenerate
        reason: String,
    },

    /// The black-box model failed or returned malformed output.
    #[error("Prediction failure: {message}")]
    PredictionFailure {
        /// Error details
        message: String,
    },

    /// A surrogate regression could not be solved.
    #[error("Regression failure: {message}")]
    RegressionFailure {
        /// Error details
        message: String,
    },

    /// A post-hoc stability or fidelity check did not meet its threshold.
    #[error("Validation failed: {message}")]
    Validation {
        /// Validation failure message
        message: String,
    },

    /// Invalid hyperparameter value provided.
    #[error("Invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Features, values or domains that do not agree with each other.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error details
        message: String,
    },
}

impl ExplicarError {
    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create a degenerate input error
    #[must_use]
    pub fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateInput {
            reason: reason.into(),
        }
    }

    /// Create a prediction failure error
    #[must_use]
    pub fn prediction(message: impl Into<String>) -> Self {
        Self::PredictionFailure {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an invalid hyperparameter error
    #[must_use]
    pub fn invalid_hyperparameter(
        param: &str,
        value: impl std::fmt::Display,
        constraint: &str,
    ) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// Keeps a `PredictionFailure` and wraps any other error in one.
    #[must_use]
    pub fn into_prediction_failure(self) -> Self {
        match self {
            Self::PredictionFailure { .. } => self,
            other => Self::prediction(other.to_string()),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, ExplicarError>;
