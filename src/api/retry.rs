//! Retry policy for transient failures.
//!
//! The client asks the policy after each failed attempt whether to try again and
//! how long to wait. The policy knows nothing about sockets, so it is tested here
//! without a server.

use std::fmt;
use std::time::Duration;

use reqwest::{Method, StatusCode};

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 2;

/// Default delay before the first retry.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Why an attempt failed in a way that might succeed later.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// The server answered with a 5xx status.
    Server { status: StatusCode, message: String },
    /// The request never produced a response (DNS, connect, reset, timeout).
    Network(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Server { status, message } => {
                write!(f, "HTTP {} ({})", status.as_u16(), message)
            }
            Failure::Network(cause) => write!(f, "network error: {}", cause),
        }
    }
}

/// Decides whether a failure is worth another attempt.
pub type RetryPredicate = fn(&Method, &Failure) -> bool;

/// Retry every transient failure regardless of method.
pub fn retry_transient(_method: &Method, _failure: &Failure) -> bool {
    true
}

/// Retry transient failures only for methods the backend treats as idempotent.
///
/// POST and PATCH carry no idempotency key, so a resend after a 5xx could
/// duplicate a side effect.
pub fn idempotent_only(method: &Method, _failure: &Failure) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE
    )
}

/// Exponential backoff: `base * factor^attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    factor: u32,
}

impl Backoff {
    /// Doubling backoff starting at `base`.
    pub fn exponential(base: Duration) -> Self {
        Self { base, factor: 2 }
    }

    /// Backoff growing by `factor` per attempt. Factors below 2 are raised to 2 so
    /// delays keep increasing.
    pub fn with_factor(base: Duration, factor: u32) -> Self {
        Self {
            base,
            factor: factor.max(2),
        }
    }

    /// Delay before the retry following the zero-based `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(self.factor.saturating_pow(attempt))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::exponential(DEFAULT_BACKOFF_BASE)
    }
}

/// Max retries + backoff + retryable predicate.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Backoff,
    retryable: RetryPredicate,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::default(),
            retryable: retry_transient,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_predicate(mut self, retryable: RetryPredicate) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// How long to wait before retrying after the zero-based `attempt` failed,
    /// or `None` when the failure must be surfaced.
    pub fn next_delay(&self, attempt: u32, method: &Method, failure: &Failure) -> Option<Duration> {
        if attempt >= self.max_retries || !(self.retryable)(method, failure) {
            return None;
        }
        Some(self.backoff.delay(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIES)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
