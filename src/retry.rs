//! Retry policy and backoff helpers.
//!
//! A policy is declared on the connector and may be replaced wholesale by a
//! request. It is normalized when read: `tries <= 0` means a single attempt and
//! a negative interval means no delay.
//!
//! ```
//! use courier_http::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3).with_interval_ms(100).with_exponential_backoff(true);
//! assert_eq!(policy.max_attempts(), 3);
//! assert_eq!(policy.delay_before(2), Duration::from_millis(100));
//! assert_eq!(policy.delay_before(3), Duration::from_millis(200));
//! ```

use crate::error::{RequestError, Result};
use crate::request::Request;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Called between a classified failure and the next attempt.
///
/// Return `Ok(false)` to stop retrying. The handler may mutate the request
/// (new token, extra header); the next attempt is rebuilt from it.
pub type RetryHandler = Arc<dyn Fn(&RequestError, &mut Request) -> Result<bool> + Send + Sync>;

/// How often and how patiently to retry classified failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub tries: i32,
    /// Delay between attempts in milliseconds
    pub interval_ms: i64,
    /// Double the delay after every failed attempt
    pub exponential_backoff: bool,
    /// Raise the last failure when attempts run out instead of returning the response
    pub throw_on_max_tries: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            tries: 1,
            interval_ms: 0,
            exponential_backoff: false,
            throw_on_max_tries: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(tries: i32) -> Self {
        Self {
            tries,
            ..Default::default()
        }
    }

    pub fn with_interval_ms(mut self, interval_ms: i64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn with_exponential_backoff(mut self, enabled: bool) -> Self {
        self.exponential_backoff = enabled;
        self
    }

    pub fn with_throw_on_max_tries(mut self, enabled: bool) -> Self {
        self.throw_on_max_tries = enabled;
        self
    }

    /// Attempts to make; never less than one.
    pub fn max_attempts(&self) -> u32 {
        if self.tries <= 0 {
            1
        } else {
            self.tries as u32
        }
    }

    /// Delay to wait before attempt number `attempt` (1-based).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let base_ms = self.interval_ms.max(0) as u64;
        if base_ms == 0 || attempt <= 1 {
            return Duration::ZERO;
        }
        if self.exponential_backoff {
            exponential_backoff(attempt - 2, base_ms)
        } else {
            Duration::from_millis(base_ms)
        }
    }
}

/// Check if status code indicates a transient failure worth retrying
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504)
}

/// Exponential backoff delay calculation
///
/// `attempt` is zero-based; the exponent is capped at 10.
pub fn exponential_backoff(attempt: u32, base_ms: u64) -> Duration {
    let delay_ms = base_ms.saturating_mul(2_u64.pow(attempt.min(10)));
    Duration::from_millis(delay_ms)
}
