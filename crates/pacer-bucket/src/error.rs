//! Error types for bucket configuration.

use thiserror::Error;

/// Errors raised when a [`BucketConfig`](crate::BucketConfig) is rejected.
///
/// The bucket operations themselves never fail; these only come from the
/// validated construction path.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Rate is outside the range the bucket can run at, or not a number.
    #[error("invalid rate: {rate} (must be between 1 and 1000000 tokens per second)")]
    InvalidRate {
        /// The rejected rate.
        rate: f64,
    },

    /// Burst size is zero, negative or not a number.
    #[error("invalid burst size: {burst_size} (must be a positive, finite token count)")]
    InvalidBurstSize {
        /// The rejected burst size.
        burst_size: f64,
    },
}

/// Result type alias for configuration.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
