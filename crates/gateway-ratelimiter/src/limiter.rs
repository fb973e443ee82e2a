use crate::config::WindowType;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Result of attempting to acquire permits.
/// Ok(wait_duration) means permits acquired (possibly after waiting).
/// Err(timeout) means acquisition failed due to timeout.
type AcquireResult = Result<Duration, Duration>;

/// Token bucket rate limiter state.
///
/// `capacity` tokens refill continuously at `capacity / refill_period`
/// tokens per nanosecond, rather than resetting in one burst at a period
/// boundary. `available` is tracked as a float so a refill of, say, half a
/// token between calls isn't lost to integer truncation.
#[derive(Debug)]
struct TokenBucketState {
    capacity: f64,
    refill_rate_per_ns: f64,
    timeout_duration: Duration,
    available: f64,
    last_refill: Instant,
}

impl TokenBucketState {
    fn new(capacity: usize, refill_period: Duration, timeout_duration: Duration) -> Self {
        let refill_rate_per_ns = capacity as f64 / (refill_period.as_nanos().max(1) as f64);
        Self {
            capacity: capacity as f64,
            refill_rate_per_ns,
            timeout_duration,
            available: capacity as f64,
            last_refill: Instant::now(),
        }
    }

    /// Tokens available right now, computed without mutating state so it
    /// can be called from a `&self` context (e.g. `available_permits`).
    fn peek_available(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let refilled = elapsed.as_nanos() as f64 * self.refill_rate_per_ns;
        (self.available + refilled).min(self.capacity)
    }

    fn refill(&mut self, now: Instant) {
        self.available = self.peek_available(now);
        self.last_refill = now;
    }

    fn try_acquire(&mut self, permits: usize) -> AcquireResult {
        let now = Instant::now();
        self.refill(now);

        let permits = permits as f64;
        if self.available >= permits {
            self.available -= permits;
            return Ok(Duration::ZERO);
        }

        let wait = self.time_until_available(permits);
        if wait > self.timeout_duration {
            Err(self.timeout_duration)
        } else {
            Ok(wait)
        }
    }

    /// How long until `permits` tokens are available, independent of
    /// whether the caller is willing to wait that long.
    fn time_until_available(&self, permits: f64) -> Duration {
        let now = Instant::now();
        let available = self.peek_available(now);
        let deficit = permits - available;
        if deficit <= 0.0 {
            return Duration::ZERO;
        }
        let nanos = deficit / self.refill_rate_per_ns;
        Duration::from_nanos(nanos.ceil() as u64)
    }

    fn available_permits(&self) -> usize {
        self.peek_available(Instant::now()).floor() as usize
    }
}

/// Sliding window rate limiter state.
///
/// Stores timestamps of each accepted request and counts those within the
/// window `[now-W, now]`. Head-of-deque eviction is amortized O(1); exact
/// (no averaging), at O(n) memory in `limit_for_period`.
#[derive(Debug)]
struct SlidingWindowState {
    limit_for_period: usize,
    window_duration: Duration,
    timeout_duration: Duration,
    /// Timestamps of requests within the current window.
    request_log: VecDeque<Instant>,
}

impl SlidingWindowState {
    fn new(limit_for_period: usize, window_duration: Duration, timeout_duration: Duration) -> Self {
        Self {
            limit_for_period,
            window_duration,
            timeout_duration,
            request_log: VecDeque::with_capacity(limit_for_period),
        }
    }

    fn evict_expired(&mut self, now: Instant) {
        while let Some(&timestamp) = self.request_log.front() {
            if now.duration_since(timestamp) >= self.window_duration {
                self.request_log.pop_front();
            } else {
                break;
            }
        }
    }

    fn try_acquire(&mut self, permits: usize) -> AcquireResult {
        let now = Instant::now();
        self.evict_expired(now);

        if self.request_log.len() + permits <= self.limit_for_period {
            for _ in 0..permits {
                self.request_log.push_back(now);
            }
            return Ok(Duration::ZERO);
        }

        // Not enough capacity - find when enough of the oldest entries
        // will have expired to free `permits` slots.
        let need_to_expire = self.request_log.len() + permits - self.limit_for_period;
        let expiry_index = need_to_expire.saturating_sub(1);
        if let Some(&entry) = self.request_log.get(expiry_index) {
            let time_until_slot = entry
                .checked_add(self.window_duration)
                .map(|expiry| expiry.saturating_duration_since(now))
                .unwrap_or(Duration::ZERO);

            if time_until_slot > self.timeout_duration {
                Err(self.timeout_duration)
            } else {
                Ok(time_until_slot)
            }
        } else {
            // `permits` alone exceeds `limit_for_period`: can never be
            // satisfied regardless of wait.
            Err(self.timeout_duration)
        }
    }

    fn time_until_available(&self, permits: usize) -> Duration {
        let now = Instant::now();
        let mut log = self.request_log.clone();
        while let Some(&timestamp) = log.front() {
            if now.duration_since(timestamp) >= self.window_duration {
                log.pop_front();
            } else {
                break;
            }
        }
        if log.len() + permits <= self.limit_for_period {
            return Duration::ZERO;
        }
        let need_to_expire = log.len() + permits - self.limit_for_period;
        let expiry_index = need_to_expire.saturating_sub(1);
        log.get(expiry_index)
            .and_then(|&entry| entry.checked_add(self.window_duration))
            .map(|expiry| expiry.saturating_duration_since(now))
            .unwrap_or(Duration::MAX)
    }

    fn available_permits(&self) -> usize {
        let now = Instant::now();
        let expired = self
            .request_log
            .iter()
            .take_while(|&&ts| now.duration_since(ts) >= self.window_duration)
            .count();
        self.limit_for_period
            .saturating_sub(self.request_log.len() - expired)
    }
}

/// Enum-based rate limiter state that dispatches to the appropriate implementation.
#[derive(Debug)]
enum RateLimiterStateInner {
    TokenBucket(TokenBucketState),
    SlidingWindow(SlidingWindowState),
}

impl RateLimiterStateInner {
    fn new(
        window_type: WindowType,
        limit_for_period: usize,
        refresh_period: Duration,
        timeout_duration: Duration,
    ) -> Self {
        match window_type {
            WindowType::TokenBucket => Self::TokenBucket(TokenBucketState::new(
                limit_for_period,
                refresh_period,
                timeout_duration,
            )),
            WindowType::SlidingWindow => Self::SlidingWindow(SlidingWindowState::new(
                limit_for_period,
                refresh_period,
                timeout_duration,
            )),
        }
    }

    fn try_acquire(&mut self, permits: usize) -> AcquireResult {
        match self {
            Self::TokenBucket(state) => state.try_acquire(permits),
            Self::SlidingWindow(state) => state.try_acquire(permits),
        }
    }

    fn time_until_available(&self, permits: usize) -> Duration {
        match self {
            Self::TokenBucket(state) => state.time_until_available(permits as f64),
            Self::SlidingWindow(state) => state.time_until_available(permits),
        }
    }

    fn available_permits(&self) -> usize {
        match self {
            Self::TokenBucket(state) => state.available_permits(),
            Self::SlidingWindow(state) => state.available_permits(),
        }
    }
}

/// Shared rate limiter that can be cloned across services.
#[derive(Debug, Clone)]
pub(crate) struct SharedRateLimiter {
    state: Arc<Mutex<RateLimiterStateInner>>,
}

impl SharedRateLimiter {
    pub(crate) fn new(
        window_type: WindowType,
        limit_for_period: usize,
        refresh_period: Duration,
        timeout_duration: Duration,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(RateLimiterStateInner::new(
                window_type,
                limit_for_period,
                refresh_period,
                timeout_duration,
            ))),
        }
    }

    /// Attempts to acquire a single permit, waiting up to the configured
    /// timeout if one isn't immediately available.
    /// Returns Ok(duration_waited) if successful, Err if rate limited.
    pub(crate) async fn acquire(&self) -> Result<Duration, ()> {
        let result = {
            let mut state = self.state.lock().unwrap();
            state.try_acquire(1)
        };

        match result {
            Ok(Duration::ZERO) => {
                // Got permit immediately
                Ok(Duration::ZERO)
            }
            Ok(wait_duration) => {
                // Need to wait
                sleep(wait_duration).await;

                // Try again after waiting
                let mut state = self.state.lock().unwrap();
                match state.try_acquire(1) {
                    Ok(additional_wait) => Ok(wait_duration + additional_wait),
                    Err(_) => Err(()), // Timeout exceeded
                }
            }
            Err(_) => {
                // Timeout would be exceeded
                Err(())
            }
        }
    }

    /// Returns the current number of available permits.
    #[allow(dead_code)]
    pub(crate) fn available_permits(&self) -> usize {
        self.state.lock().unwrap().available_permits()
    }

    /// How long until `permits` permits would be available, independent
    /// of whether the caller is willing to wait.
    #[allow(dead_code)]
    pub(crate) fn time_until_available(&self, permits: usize) -> Duration {
        self.state.lock().unwrap().time_until_available(permits)
    }

    /// Attempts to acquire `permits` permits without waiting. Unlike
    /// [`acquire`], this never sleeps: a request that can't be served
    /// immediately is rejected with the duration until enough permits
    /// would be available, rather than parked. This is what the gateway's
    /// `tryAcquire(n)` contract needs — the orchestrator decides whether
    /// to fail over or surface a `RateLimited` error, not the limiter.
    pub(crate) fn try_acquire_now(&self, permits: usize) -> Result<(), Duration> {
        let mut state = self.state.lock().unwrap();
        match state.try_acquire(permits) {
            Ok(Duration::ZERO) => Ok(()),
            Ok(wait) => {
                // Permits would be available after `wait`, but the caller
                // asked not to wait, so we haven't actually consumed any.
                Err(wait)
            }
            Err(timeout) => Err(timeout),
        }
    }
}
