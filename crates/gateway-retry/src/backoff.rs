//! Interval functions controlling the delay between retry attempts.

use std::time::Duration;

/// Computes the delay before a retry attempt.
///
/// `attempt` is 0-indexed: the delay before the *first* retry (i.e. after
/// the initial call fails) is `interval(0)`.
pub trait IntervalFunction: Send + Sync {
    fn interval(&self, attempt: usize) -> Duration;
}

/// Always waits the same fixed duration between attempts.
pub struct FixedInterval {
    duration: Duration,
}

impl FixedInterval {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl IntervalFunction for FixedInterval {
    fn interval(&self, _attempt: usize) -> Duration {
        self.duration
    }
}

/// Doubles (or `multiplier`-scales) the delay on each attempt, capped at
/// `max_interval`.
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Duration,
}

impl ExponentialBackoff {
    /// `multiplier` defaults to 2.0, `max_interval` to 30 seconds.
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: Duration::from_secs(30),
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn interval(&self, attempt: usize) -> Duration {
        let scaled = self.initial_interval.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled.min(self.max_interval.as_secs_f64()))
    }
}

/// Like [`ExponentialBackoff`], but jitters the delay by up to
/// `randomization_factor` in either direction to avoid synchronized
/// retry storms across clients.
pub struct ExponentialRandomBackoff {
    initial_interval: Duration,
    multiplier: f64,
    max_interval: Duration,
    randomization_factor: f64,
}

impl ExponentialRandomBackoff {
    /// `multiplier` defaults to 2.0, `max_interval` to 30 seconds,
    /// `randomization_factor` to 0.5 (±50%).
    pub fn new(initial_interval: Duration) -> Self {
        Self {
            initial_interval,
            multiplier: 2.0,
            max_interval: Duration::from_secs(30),
            randomization_factor: 0.5,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    pub fn with_randomization_factor(mut self, factor: f64) -> Self {
        self.randomization_factor = factor;
        self
    }
}

impl IntervalFunction for ExponentialRandomBackoff {
    fn interval(&self, attempt: usize) -> Duration {
        use rand::Rng;

        let base = self.initial_interval.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let base = base.min(self.max_interval.as_secs_f64());

        let jitter = rand::rng().random_range(-self.randomization_factor..=self.randomization_factor);
        let jittered = (base * (1.0 + jitter)).max(0.0);

        Duration::from_secs_f64(jittered)
    }
}

/// An [`IntervalFunction`] backed by an arbitrary closure.
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn interval(&self, attempt: usize) -> Duration {
        (self.f)(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_interval_never_changes() {
        let backoff = FixedInterval::new(Duration::from_millis(50));
        assert_eq!(backoff.interval(0), Duration::from_millis(50));
        assert_eq!(backoff.interval(10), Duration::from_millis(50));
    }

    #[test]
    fn exponential_backoff_doubles_then_caps() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(100))
            .with_max_interval(Duration::from_millis(350));

        assert_eq!(backoff.interval(0), Duration::from_millis(100));
        assert_eq!(backoff.interval(1), Duration::from_millis(200));
        assert_eq!(backoff.interval(2), Duration::from_millis(350)); // would be 400, capped
    }

    #[test]
    fn exponential_random_backoff_stays_within_jitter_bounds() {
        let backoff = ExponentialRandomBackoff::new(Duration::from_millis(100))
            .with_randomization_factor(0.5)
            .with_max_interval(Duration::from_secs(10));

        for attempt in 0..5 {
            let delay = backoff.interval(attempt);
            let base_secs = 0.1 * 2f64.powi(attempt as i32);
            assert!(delay.as_secs_f64() <= base_secs * 1.5 + f64::EPSILON);
            assert!(delay.as_secs_f64() >= 0.0);
        }
    }

    #[test]
    fn fn_interval_delegates_to_closure() {
        let backoff = FnInterval::new(|attempt: usize| Duration::from_millis(attempt as u64 * 10));
        assert_eq!(backoff.interval(3), Duration::from_millis(30));
    }
}
