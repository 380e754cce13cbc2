//! Error type shared by tree construction, configuration and density queries.

/// Failures surfaced by the estimator. None of these are retried internally:
/// they all describe a violated precondition at the call boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Malformed input: empty sample set, non-positive bandwidth or leaf size,
    /// negative tolerance, inconsistent or non-finite coordinates.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown kernel, metric, evaluation-mode or option name.
    #[error("unsupported value '{value}' for option '{option}'")]
    UnsupportedOption {
        /// The option being set (e.g. `kernel_type`).
        option: String,
        /// The rejected value.
        value: String,
    },

    /// Query dimensionality differs from the training dimensionality.
    #[error("dimension mismatch: expected {expected} dimensions but got {got}")]
    DimensionMismatch {
        /// Dimensionality of the training samples.
        expected: usize,
        /// Dimensionality of the offending query point.
        got: usize,
    },

    /// Operation called in a lifecycle state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}

impl Error {
    pub(crate) fn unsupported(option: &str, value: impl Into<String>) -> Self {
        Error::UnsupportedOption {
            option: option.to_string(),
            value: value.into(),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
