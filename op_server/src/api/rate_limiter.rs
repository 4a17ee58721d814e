//! Sliding-window rate limiting for credential endpoints.
//!
//! Login and forgot-password are limited per normalized email so a single
//! account cannot be brute-forced or flooded with reset mail.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Upper bound on distinct keys held by a [`KeyedRateLimiter`]
pub const MAX_TRACKED_KEYS: usize = 10_000;

/// Longest gap between sweeps of idle windows
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Rate limiter using a sliding window algorithm
#[derive(Debug)]
pub struct RateLimiter {
    /// Timestamps of recent requests
    timestamps: VecDeque<Instant>,
    /// Maximum number of requests allowed in the window
    max_requests: usize,
    /// Time window for rate limiting
    window: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Example
    ///
    /// ```
    /// use op_server::api::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// // Allow 5 attempts per 5 minutes
    /// let limiter = RateLimiter::new(5, Duration::from_secs(300));
    /// ```
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
        }
    }

    /// Check if a request should be allowed
    ///
    /// Returns `true` if the request is allowed, `false` if rate limit exceeded.
    /// Rejected requests are not recorded.
    ///
    /// # Example
    ///
    /// ```
    /// # use op_server::api::rate_limiter::RateLimiter;
    /// # use std::time::Duration;
    /// let mut limiter = RateLimiter::new(3, Duration::from_secs(1));
    ///
    /// for _ in 0..3 {
    ///     assert!(limiter.check());
    /// }
    /// assert!(!limiter.check());
    /// ```
    pub fn check(&mut self) -> bool {
        let now = Instant::now();
        self.evict(now);

        if self.timestamps.len() >= self.max_requests {
            return false;
        }

        self.timestamps.push_back(now);
        true
    }

    /// Get the number of remaining requests allowed in the current window
    pub fn remaining(&self) -> usize {
        self.max_requests.saturating_sub(self.timestamps.len())
    }

    /// Get the time until the oldest request leaves the window
    ///
    /// Returns `None` if there are no requests in the current window.
    pub fn reset_in(&self) -> Option<Duration> {
        self.timestamps.front().map(|oldest| {
            let elapsed = Instant::now().duration_since(*oldest);
            self.window.saturating_sub(elapsed)
        })
    }

    /// Drop timestamps outside the window
    fn evict(&mut self, now: Instant) {
        while let Some(ts) = self.timestamps.front() {
            if now.duration_since(*ts) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    fn is_idle(&mut self, now: Instant) -> bool {
        self.evict(now);
        self.timestamps.is_empty()
    }
}

/// One [`RateLimiter`] per key, created on first use
///
/// At most `max_keys` windows are tracked. While the map is full, keys it
/// does not already hold are refused rather than evicting someone else's
/// window. Idle windows are swept at most once per sweep interval.
#[derive(Debug)]
pub struct KeyedRateLimiter {
    state: Mutex<KeyedWindows>,
    max_requests: usize,
    window: Duration,
    max_keys: usize,
    sweep_interval: Duration,
}

#[derive(Debug)]
struct KeyedWindows {
    limiters: HashMap<String, RateLimiter>,
    last_sweep: Instant,
}

impl KeyedRateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self::with_max_keys(max_requests, window, MAX_TRACKED_KEYS)
    }

    /// Limiter that tracks at most `max_keys` distinct keys
    pub fn with_max_keys(max_requests: usize, window: Duration, max_keys: usize) -> Self {
        Self {
            state: Mutex::new(KeyedWindows {
                limiters: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            max_requests,
            window,
            max_keys,
            sweep_interval: window.min(SWEEP_INTERVAL),
        }
    }

    /// Login attempts: 5 per 5 minutes
    pub fn login() -> Self {
        Self::new(5, Duration::from_secs(5 * 60))
    }

    /// Forgot-password requests: 3 per hour
    pub fn forgot_password() -> Self {
        Self::new(3, Duration::from_secs(60 * 60))
    }

    /// Record an attempt for `key`; `false` once the key is over its limit
    /// or when the key is new and no window can be allotted to it
    pub fn check(&self, key: &str) -> bool {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        if now.duration_since(state.last_sweep) >= self.sweep_interval {
            state.limiters.retain(|_, limiter| !limiter.is_idle(now));
            state.last_sweep = now;
        }

        if let Some(limiter) = state.limiters.get_mut(key) {
            return limiter.check();
        }

        if state.limiters.len() >= self.max_keys {
            tracing::debug!(
                tracked_keys = state.limiters.len(),
                "Rate limiter full, refusing untracked key"
            );
            return false;
        }

        let mut limiter = RateLimiter::new(self.max_requests, self.window);
        let allowed = limiter.check();
        state.limiters.insert(key.to_string(), limiter);
        allowed
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .limiters
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let mut limiter = RateLimiter::new(3, Duration::from_secs(1));

        for _ in 0..3 {
            assert!(limiter.check());
        }

        assert!(!limiter.check(), "Should block request over limit");
    }

    #[test]
    fn test_rate_limiter_window_expiry() {
        let mut limiter = RateLimiter::new(2, Duration::from_millis(100));

        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());

        thread::sleep(Duration::from_millis(150));

        assert!(limiter.check(), "Should allow after window expires");
    }

    #[test]
    fn test_remaining_count() {
        let mut limiter = RateLimiter::new(5, Duration::from_secs(1));
        assert_eq!(limiter.remaining(), 5);

        limiter.check();
        limiter.check();
        assert_eq!(limiter.remaining(), 3);
    }

    #[test]
    fn test_reset_in() {
        let mut limiter = RateLimiter::new(5, Duration::from_secs(1));
        assert!(limiter.reset_in().is_none());

        limiter.check();
        let reset = limiter.reset_in().expect("reset time after a request");
        assert!(reset <= Duration::from_secs(1));
    }

    #[test]
    fn test_keyed_limiter_isolates_keys() {
        let limiter = KeyedRateLimiter::new(2, Duration::from_secs(60));

        assert!(limiter.check("a@x.com"));
        assert!(limiter.check("a@x.com"));
        assert!(!limiter.check("a@x.com"));

        assert!(limiter.check("b@x.com"), "Other keys have their own window");
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[test]
    fn test_login_and_forgot_password_limits() {
        let login = KeyedRateLimiter::login();
        for _ in 0..5 {
            assert!(login.check("a@x.com"));
        }
        assert!(!login.check("a@x.com"));

        let forgot = KeyedRateLimiter::forgot_password();
        for _ in 0..3 {
            assert!(forgot.check("a@x.com"));
        }
        assert!(!forgot.check("a@x.com"));
    }

    #[test]
    fn test_idle_keys_swept() {
        let limiter = KeyedRateLimiter::with_max_keys(1, Duration::from_millis(50), 64);
        for i in 0..64 {
            limiter.check(&format!("user{i}@x.com"));
        }
        assert_eq!(limiter.tracked_keys(), 64);

        thread::sleep(Duration::from_millis(120));
        assert!(limiter.check("fresh@x.com"));
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_tracked_keys_stay_bounded() {
        let limiter = KeyedRateLimiter::with_max_keys(3, Duration::from_secs(3600), 100);
        assert!(limiter.check("victim@x.com"));

        for i in 0..1_000 {
            limiter.check(&format!("flood{i}@x.com"));
        }
        assert_eq!(limiter.tracked_keys(), 100);

        // New keys are refused while full; tracked windows keep counting.
        assert!(!limiter.check("newcomer@x.com"));
        assert!(limiter.check("victim@x.com"));
        assert!(limiter.check("victim@x.com"));
        assert!(!limiter.check("victim@x.com"));
    }

    #[test]
    fn test_default_capacity_bounds_distinct_keys() {
        let limiter = KeyedRateLimiter::forgot_password();
        for i in 0..(MAX_TRACKED_KEYS + 500) {
            limiter.check(&format!("user{i}@x.com"));
        }
        assert_eq!(limiter.tracked_keys(), MAX_TRACKED_KEYS);
    }
}
