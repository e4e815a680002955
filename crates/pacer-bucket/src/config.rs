//! Bucket configuration.

use serde::{Deserialize, Serialize};

use crate::bucket::{MAX_RATE, MIN_RATE};
use crate::error::{ConfigError, ConfigResult};

/// Rate and capacity of a single bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    /// Tokens generated per second.
    pub rate: f64,
    /// Maximum tokens the bucket may accumulate while idle.
    pub burst_size: f64,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            rate: 10.0,
            burst_size: 10.0,
        }
    }
}

impl BucketConfig {
    /// Create a config with the given rate and burst size.
    pub fn new(rate: f64, burst_size: f64) -> Self {
        Self { rate, burst_size }
    }

    /// Set the refill rate.
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Set the burst size.
    pub fn burst_size(mut self, burst_size: f64) -> Self {
        self.burst_size = burst_size;
        self
    }

    /// Reject values the bucket would otherwise silently clamp.
    ///
    /// Accepted rates run from one token per second up to one token per
    /// microsecond.
    pub fn validate(&self) -> ConfigResult<()> {
        if !(MIN_RATE..=MAX_RATE).contains(&self.rate) {
            return Err(ConfigError::InvalidRate { rate: self.rate });
        }
        if !self.burst_size.is_finite() || self.burst_size <= 0.0 {
            return Err(ConfigError::InvalidBurstSize {
                burst_size: self.burst_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_config() {
        let config = BucketConfig::default();
        assert_eq!(config.rate, 10.0);
        assert_eq!(config.burst_size, 10.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_ignores_environment() {
        std::env::set_var("PACER_RATE", "99");
        std::env::set_var("PACER_BURST_SIZE", "99");
        let config = BucketConfig::default();
        std::env::remove_var("PACER_RATE");
        std::env::remove_var("PACER_BURST_SIZE");

        assert_eq!(config, BucketConfig::new(10.0, 10.0));
    }

    #[test]
    fn test_builder() {
        let config = BucketConfig::default().rate(250.0).burst_size(5.0);
        assert_eq!(config, BucketConfig::new(250.0, 5.0));
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(-3.0 ; "negative")]
    #[test_case(0.5 ; "below one per second")]
    #[test_case(5e6 ; "above one per microsecond")]
    #[test_case(f64::NAN ; "nan")]
    #[test_case(f64::INFINITY ; "infinite")]
    fn test_invalid_rate(rate: f64) {
        let err = BucketConfig::new(rate, 1.0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRate { .. }));
    }

    #[test_case(1.0 ; "one per second")]
    #[test_case(2_500.0 ; "typical")]
    #[test_case(1_000_000.0 ; "one per microsecond")]
    fn test_valid_rate(rate: f64) {
        assert!(BucketConfig::new(rate, 1.0).validate().is_ok());
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(-1.0 ; "negative")]
    #[test_case(f64::NAN ; "nan")]
    fn test_invalid_burst_size(burst_size: f64) {
        let err = BucketConfig::new(1.0, burst_size).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBurstSize { .. }));
    }

    #[test]
    fn test_serde_partial_document() {
        let config: BucketConfig = serde_json::from_str(r#"{ "rate": 3.5 }"#).unwrap();
        assert_eq!(config.rate, 3.5);
        assert_eq!(config.burst_size, BucketConfig::default().burst_size);
    }
}
