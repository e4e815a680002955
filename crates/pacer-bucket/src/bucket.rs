//! Token bucket with reservation-based accounting.
//!
//! Tokens refill continuously at `1 / per_token` tokens per microsecond and
//! saturate at `burst_size`. Callers never wait inside the lock: [`reserve`]
//! commits the request against future capacity and returns how long the
//! caller has to wait, and the wait happens afterwards.
//!
//! [`reserve`]: TokenBucket::reserve

use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, trace};

use crate::clock::{Clock, MonotonicClock};
use crate::config::BucketConfig;
use crate::error::ConfigResult;

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Lowest accepted rate in tokens per second.
pub(crate) const MIN_RATE: f64 = 1.0;

/// Lowest accepted `per_token` in microseconds. Caps the rate at one token
/// per microsecond.
pub(crate) const MIN_PER_TOKEN: f64 = 1.0;

/// Highest rate a bucket can run at, in tokens per second.
pub(crate) const MAX_RATE: f64 = MICROS_PER_SEC / MIN_PER_TOKEN;

/// Microseconds per token for `rate`, with out-of-range rates clamped.
fn per_token_for(rate: f64) -> f64 {
    // `!(rate >= MIN_RATE)` also catches NaN.
    let rate = if rate >= MIN_RATE { rate } else { MIN_RATE };
    (MICROS_PER_SEC / rate).max(MIN_PER_TOKEN)
}

/// Mutable bucket state. Only touched with the bucket lock held.
#[derive(Debug, Clone, PartialEq)]
struct BucketState {
    /// Tokens available right now, in `[0, burst_size]`.
    stored_tokens: f64,
    /// Microseconds needed to generate one token.
    per_token: f64,
    /// Maximum stored tokens.
    burst_size: f64,
    /// Watermark of all promised token generation, in clock microseconds.
    next_time: f64,
}

impl BucketState {
    fn new(rate: f64, burst_size: f64) -> Self {
        Self {
            stored_tokens: 0.0,
            per_token: per_token_for(rate),
            burst_size: if burst_size > 0.0 { burst_size } else { 0.0 },
            next_time: 0.0,
        }
    }

    /// Credit tokens generated between the watermark and `now`.
    fn resync(&mut self, now: f64) {
        if now > self.next_time {
            self.per_token = self.per_token.max(MIN_PER_TOKEN);
            let accrued = (now - self.next_time) / self.per_token;
            self.stored_tokens = (self.stored_tokens + accrued).min(self.burst_size);
            self.next_time = now;
        }
    }

    /// Commit `tokens` and return the wait in microseconds owed to earlier
    /// reservations.
    fn reserve(&mut self, tokens: f64, now: f64) -> f64 {
        self.resync(now);

        let wait = self.next_time - now;
        let tokens = tokens.max(0.0);
        let from_stock = tokens.min(self.stored_tokens);
        let from_future = tokens - from_stock;

        self.next_time += from_future * self.per_token;
        self.stored_tokens -= from_stock;

        wait
    }
}

/// Thread-safe token bucket rate limiter.
///
/// Share it between threads by reference or behind an `Arc`; every method
/// takes `&self`.
///
/// ```
/// use pacer_bucket::TokenBucket;
///
/// let bucket = TokenBucket::new(1_000.0, 10.0);
/// let waited = bucket.acquire_one();
/// assert!(waited >= 0.0);
/// ```
#[derive(Debug)]
pub struct TokenBucket<C = MonotonicClock> {
    state: Mutex<BucketState>,
    clock: C,
}

impl TokenBucket<MonotonicClock> {
    /// Create a bucket refilling at `rate` tokens per second that stores at
    /// most `burst_size` tokens.
    ///
    /// Rates below one token per second are raised to one; the bucket starts
    /// with no stored tokens.
    pub fn new(rate: f64, burst_size: f64) -> Self {
        Self::with_clock(rate, burst_size, MonotonicClock::new())
    }

    /// Validate `config` and build a bucket from it.
    pub fn from_config(config: &BucketConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::new(config.rate, config.burst_size))
    }
}

impl<C: Clock> TokenBucket<C> {
    /// Create a bucket driven by a custom clock.
    pub fn with_clock(rate: f64, burst_size: f64, clock: C) -> Self {
        debug!(rate, burst_size, "creating token bucket");
        Self {
            state: Mutex::new(BucketState::new(rate, burst_size)),
            clock,
        }
    }

    /// Change the refill rate.
    ///
    /// Tokens already stored and reservations already made are unaffected;
    /// the new rate applies to tokens generated from now on.
    pub fn set_rate(&self, rate: f64) {
        let per_token = per_token_for(rate);
        self.state.lock().per_token = per_token;
        debug!(rate, per_token, "bucket rate updated");
    }

    /// Effective refill rate in tokens per second.
    pub fn rate(&self) -> f64 {
        MICROS_PER_SEC / self.state.lock().per_token
    }

    /// Maximum number of stored tokens.
    pub fn burst_size(&self) -> f64 {
        self.state.lock().burst_size
    }

    /// Tokens that could be taken right now without waiting.
    pub fn available_tokens(&self) -> f64 {
        let now = self.clock.now_micros() as f64;
        let mut state = self.state.lock();
        state.resync(now);
        state.stored_tokens
    }

    /// Reserve `tokens` and return how long the caller must wait before using
    /// them.
    ///
    /// The bucket is updated as if the wait already happened. The returned
    /// wait only covers reservations made before this one; the cost of this
    /// request is paid by whoever reserves next.
    pub fn reserve(&self, tokens: f64) -> Duration {
        let wait = {
            let mut state = self.state.lock();
            let now = self.clock.now_micros() as f64;
            state.reserve(tokens, now)
        };

        let wait = Duration::from_micros(wait as u64);
        trace!(tokens, wait_us = wait.as_micros() as u64, "tokens reserved");
        wait
    }

    /// Reserve `tokens` and block until they are usable.
    ///
    /// Returns the time waited in seconds.
    pub fn acquire(&self, tokens: f64) -> f64 {
        let wait = self.reserve(tokens);
        self.clock.sleep(wait);
        wait.as_secs_f64()
    }

    /// Shorthand for `acquire(1.0)`.
    pub fn acquire_one(&self) -> f64 {
        self.acquire(1.0)
    }

    /// Acquire `tokens` unless the bucket is already committed beyond
    /// `timeout`.
    ///
    /// Returns `false` without reserving anything when the outstanding debt
    /// exceeds `timeout`. Otherwise this behaves like [`acquire`] and returns
    /// `true`. The check and the reservation take the lock separately, so the
    /// actual wait can slightly exceed `timeout` under contention.
    ///
    /// [`acquire`]: TokenBucket::acquire
    pub fn try_acquire(&self, tokens: f64, timeout: Duration) -> bool {
        let now = self.clock.now_micros() as f64;
        let next_time = self.state.lock().next_time;
        let deadline = now + timeout.as_micros() as f64;

        if next_time > deadline {
            debug!(
                tokens,
                timeout_ms = timeout.as_millis() as u64,
                backlog_us = (next_time - now) as u64,
                "acquire rejected, bucket committed past timeout"
            );
            return false;
        }

        self.acquire(tokens);
        true
    }

    /// Shorthand for `try_acquire(1.0, timeout)`.
    pub fn try_acquire_one(&self, timeout: Duration) -> bool {
        self.try_acquire(1.0, timeout)
    }

    /// Reserve `tokens` and wait on the tokio timer instead of blocking the
    /// thread.
    ///
    /// Accounting is identical to [`acquire`](TokenBucket::acquire).
    #[cfg(feature = "async")]
    pub async fn acquire_async(&self, tokens: f64) -> f64 {
        let wait = self.reserve(tokens);
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        wait.as_secs_f64()
    }

    /// Shorthand for `acquire_async(1.0)`.
    #[cfg(feature = "async")]
    pub async fn acquire_one_async(&self) -> f64 {
        self.acquire_async(1.0).await
    }
}
