use thiserror::Error;

/// Error type for identifier and secret generation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid identifier length: expected {min}..={max}, got {actual}")]
    InvalidLength {
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Random source unavailable: {0}")]
    RandomSourceUnavailable(String),
}
