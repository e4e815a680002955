//! Pacer token bucket - throttle callers to a steady rate.
//!
//! A [`TokenBucket`] hands out tokens at a configured rate and lets up to
//! `burst_size` tokens accumulate while idle. Every acquisition goes through
//! a single reservation step that books the request against future capacity,
//! so concurrent callers receive disjoint, correctly ordered waits.
//!
//! - [`TokenBucket::acquire`] blocks until the reserved tokens are usable
//! - [`TokenBucket::try_acquire`] gives up immediately when the bucket is
//!   committed beyond a timeout
//! - [`TokenBucket::acquire_async`] awaits instead of blocking (feature `async`)
//!
//! Time comes from a [`Clock`]; [`ManualClock`] makes tests deterministic.

#![warn(missing_docs)]

mod bucket;
pub mod clock;
pub mod config;
pub mod error;

pub use bucket::TokenBucket;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::BucketConfig;
pub use error::{ConfigError, ConfigResult};
