//! # Circuit Breaker Module
//!
//! This module implements the circuit breaker pattern for calls to the remote
//! analysis service. After repeated failures the breaker opens and calls fail
//! fast until the reset timeout elapses.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
}

/// Circuit breaker for remote analysis calls
///
/// # State Machine
///
/// - **Closed**: Normal operation, requests pass through
/// - **Open**: Failure threshold reached, requests fail fast
/// - **Half-Open**: Reset timeout elapsed; the next request is let through and
///   its outcome decides whether the breaker closes or opens again
///
/// Uses `RecoveryConfig::circuit_breaker_threshold` and
/// `RecoveryConfig::circuit_breaker_reset_secs`.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_after: Duration,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    ///
    /// ```rust
    /// use nutribot::circuit_breaker::CircuitBreaker;
    /// use nutribot::config::RecoveryConfig;
    ///
    /// let breaker = CircuitBreaker::new(&RecoveryConfig::default());
    /// assert!(!breaker.is_open());
    /// ```
    pub fn new(config: &RecoveryConfig) -> Self {
        Self::with_reset_after(
            config.circuit_breaker_threshold,
            Duration::from_secs(config.circuit_breaker_reset_secs),
        )
    }

    pub fn with_reset_after(threshold: u32, reset_after: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold: threshold.max(1),
            reset_after,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // The state is two plain fields, a panic mid-update cannot leave it inconsistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns `true` while the breaker should block requests
    pub fn is_open(&self) -> bool {
        let state = self.lock();
        if state.consecutive_failures < self.threshold {
            return false;
        }
        match state.last_failure {
            Some(at) => at.elapsed() < self.reset_after,
            None => false,
        }
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_failure = Some(Instant::now());
    }

    /// Record a successful call, closing the breaker
    pub fn record_success(&self) {
        *self.lock() = BreakerState::default();
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::with_reset_after(2, Duration::from_secs(60));

        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(!breaker.is_open());
        breaker.record_failure();
        assert!(breaker.is_open());
        assert_eq!(breaker.failure_count(), 2);
    }

    #[test]
    fn test_success_closes() {
        let breaker = CircuitBreaker::with_reset_after(1, Duration::from_secs(60));
        breaker.record_failure();
        assert!(breaker.is_open());

        breaker.record_success();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn test_half_open_after_reset_timeout() {
        let breaker = CircuitBreaker::with_reset_after(1, Duration::from_millis(20));
        breaker.record_failure();
        assert!(breaker.is_open());

        std::thread::sleep(Duration::from_millis(40));
        assert!(!breaker.is_open());

        // A failure in half-open state reopens immediately
        breaker.record_failure();
        assert!(breaker.is_open());
    }
}
