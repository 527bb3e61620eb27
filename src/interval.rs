//! Wait-interval functions for retry backoff.
//!
//! An [`IntervalFn`] is pure data: a function from the attempt number to the
//! duration to wait before the next attempt. It describes backoff behavior
//! without executing it, so it is easy to test, clone, and inspect.
//!
//! # Strategies
//!
//! - **Fixed**: constant delay between attempts
//! - **Exponential**: `base * multiplier^(attempt - 1)`, optionally capped
//!
//! # Jitter
//!
//! Jitter adds randomness to delays so that many callers retrying the same
//! dependency do not wake up in lockstep. Enable the `jitter` feature to use
//! it:
//!
//! ```toml
//! steadfast = { version = "...", features = ["jitter"] }
//! ```
//!
//! Without the feature, jittered delays degrade to the deterministic value.

use std::time::Duration;

/// Default wait between attempts when none is configured.
pub const DEFAULT_WAIT: Duration = Duration::from_millis(500);

/// A pure function from attempt number (1-indexed) to wait duration.
///
/// # Examples
///
/// ```rust
/// use steadfast::IntervalFn;
/// use std::time::Duration;
///
/// // Exponential backoff doubling from 100ms
/// let interval = IntervalFn::exponential(Duration::from_millis(100));
///
/// assert_eq!(interval.wait_for(1), Duration::from_millis(100));
/// assert_eq!(interval.wait_for(2), Duration::from_millis(200));
/// assert_eq!(interval.wait_for(3), Duration::from_millis(400));
/// assert_eq!(interval.wait_for(4), Duration::from_millis(800));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalFn {
    strategy: WaitStrategy,
    jitter: JitterStrategy,
}

/// The backoff strategy producing the deterministic delay.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitStrategy {
    /// Fixed delay between attempts.
    Fixed(Duration),
    /// Delay grows geometrically: `base * multiplier^(attempt - 1)`.
    Exponential {
        /// Delay before the second attempt.
        base: Duration,
        /// Growth factor per attempt.
        multiplier: f64,
        /// Upper bound on the delay, if any.
        cap: Option<Duration>,
    },
}

/// Strategy for adding randomness to delays.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JitterStrategy {
    /// No jitter applied.
    #[default]
    None,
    /// Add ±percentage randomness to the delay.
    Proportional(f64),
    /// Random delay between zero and the calculated delay.
    Full,
}

impl IntervalFn {
    /// Constant delay between attempts.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use steadfast::IntervalFn;
    /// use std::time::Duration;
    ///
    /// let interval = IntervalFn::fixed(Duration::from_millis(250));
    /// assert_eq!(interval.wait_for(1), Duration::from_millis(250));
    /// assert_eq!(interval.wait_for(7), Duration::from_millis(250));
    /// ```
    pub fn fixed(delay: Duration) -> Self {
        Self {
            strategy: WaitStrategy::Fixed(delay),
            jitter: JitterStrategy::None,
        }
    }

    /// Exponential backoff doubling from `base`.
    ///
    /// Delay for attempt `n` is `base * 2^(n - 1)`. Use
    /// [`with_multiplier`](Self::with_multiplier) for a different growth
    /// factor and [`with_cap`](Self::with_cap) to bound the delay.
    pub fn exponential(base: Duration) -> Self {
        Self {
            strategy: WaitStrategy::Exponential {
                base,
                multiplier: 2.0,
                cap: None,
            },
            jitter: JitterStrategy::None,
        }
    }

    /// Set the growth factor for an exponential strategy.
    ///
    /// Values below 1.0 are clamped to 1.0 (a shrinking backoff is never
    /// what a retry wants). No effect on a fixed strategy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use steadfast::IntervalFn;
    /// use std::time::Duration;
    ///
    /// let interval = IntervalFn::exponential(Duration::from_millis(100))
    ///     .with_multiplier(1.5);
    ///
    /// assert_eq!(interval.wait_for(1), Duration::from_millis(100));
    /// assert_eq!(interval.wait_for(2), Duration::from_millis(150));
    /// assert_eq!(interval.wait_for(3), Duration::from_millis(225));
    /// ```
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        if let WaitStrategy::Exponential {
            multiplier: ref mut m,
            ..
        } = self.strategy
        {
            *m = multiplier.max(1.0);
        }
        self
    }

    /// Cap the delay of an exponential strategy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use steadfast::IntervalFn;
    /// use std::time::Duration;
    ///
    /// let interval = IntervalFn::exponential(Duration::from_millis(100))
    ///     .with_cap(Duration::from_millis(500));
    ///
    /// assert_eq!(interval.wait_for(3), Duration::from_millis(400));
    /// assert_eq!(interval.wait_for(4), Duration::from_millis(500)); // capped
    /// assert_eq!(interval.wait_for(10), Duration::from_millis(500));
    /// ```
    pub fn with_cap(mut self, max: Duration) -> Self {
        if let WaitStrategy::Exponential { ref mut cap, .. } = self.strategy {
            *cap = Some(max);
        }
        self
    }

    /// Add ±proportional jitter to delays.
    ///
    /// The factor is clamped to `0.0..=1.0`; `0.25` means the actual delay
    /// is uniformly drawn from ±25% around the calculated delay.
    ///
    /// **Note**: effective only with the `jitter` feature; without it the
    /// deterministic delay is used.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter = JitterStrategy::Proportional(factor.clamp(0.0, 1.0));
        self
    }

    /// Use full jitter: a delay uniformly drawn from zero to the calculated
    /// delay. Maximum spread against thundering herds.
    ///
    /// **Note**: effective only with the `jitter` feature; without it the
    /// deterministic delay is used.
    pub fn with_full_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Full;
        self
    }

    /// Get the wait strategy.
    pub fn strategy(&self) -> &WaitStrategy {
        &self.strategy
    }

    /// Get the jitter strategy.
    pub fn jitter(&self) -> &JitterStrategy {
        &self.jitter
    }

    /// The deterministic delay before the attempt following attempt
    /// `attempt` (1-indexed: `wait_for(1)` is the delay after the first
    /// attempt fails).
    pub fn wait_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match &self.strategy {
            WaitStrategy::Fixed(d) => *d,
            WaitStrategy::Exponential {
                base,
                multiplier,
                cap,
            } => {
                let secs = base.as_secs_f64() * multiplier.powf(f64::from(attempt - 1));
                let delay =
                    Duration::try_from_secs_f64(secs).unwrap_or(cap.unwrap_or(Duration::MAX));
                match cap {
                    Some(max) => delay.min(*max),
                    None => delay,
                }
            }
        }
    }

    /// The delay for an attempt with jitter applied, still honoring the cap.
    pub fn jittered_wait_for(&self, attempt: u32) -> Duration {
        let base = self.wait_for(attempt);
        let cap = match &self.strategy {
            WaitStrategy::Exponential { cap, .. } => *cap,
            WaitStrategy::Fixed(_) => None,
        };
        let jittered = self.jitter.apply(base);
        match cap {
            Some(max) => jittered.min(max),
            None => jittered,
        }
    }
}

impl Default for IntervalFn {
    /// Fixed [`DEFAULT_WAIT`] between attempts.
    fn default() -> Self {
        Self::fixed(DEFAULT_WAIT)
    }
}

impl JitterStrategy {
    /// Apply jitter to a calculated delay.
    pub fn apply(&self, base_delay: Duration) -> Duration {
        match self {
            JitterStrategy::None => base_delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Proportional(factor) => {
                use rand::Rng;
                let mut rng = rand::rng();
                let base_millis = base_delay.as_millis() as f64;
                let jitter_range = base_millis * factor;
                let min = (base_millis - jitter_range).max(0.0);
                let max = base_millis + jitter_range;
                let jittered_millis = rng.random_range(min..=max);
                Duration::from_millis(jittered_millis as u64)
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Proportional(_) => base_delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Full => {
                use rand::Rng;
                let mut rng = rand::rng();
                let max_millis = base_delay.as_millis() as u64;
                if max_millis == 0 {
                    Duration::ZERO
                } else {
                    Duration::from_millis(rng.random_range(0..=max_millis))
                }
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Full => base_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_delay() {
        let interval = IntervalFn::fixed(Duration::from_millis(100));

        assert_eq!(interval.wait_for(1), Duration::from_millis(100));
        assert_eq!(interval.wait_for(2), Duration::from_millis(100));
        assert_eq!(interval.wait_for(9), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_doubles() {
        let interval = IntervalFn::exponential(Duration::from_millis(100));

        assert_eq!(interval.wait_for(1), Duration::from_millis(100));
        assert_eq!(interval.wait_for(2), Duration::from_millis(200));
        assert_eq!(interval.wait_for(3), Duration::from_millis(400));
        assert_eq!(interval.wait_for(4), Duration::from_millis(800));
    }

    #[test]
    fn test_exponential_custom_multiplier() {
        let interval = IntervalFn::exponential(Duration::from_millis(100)).with_multiplier(3.0);

        assert_eq!(interval.wait_for(1), Duration::from_millis(100));
        assert_eq!(interval.wait_for(2), Duration::from_millis(300));
        assert_eq!(interval.wait_for(3), Duration::from_millis(900));
    }

    #[test]
    fn test_multiplier_below_one_clamped() {
        let interval = IntervalFn::exponential(Duration::from_millis(100)).with_multiplier(0.5);

        assert_eq!(interval.wait_for(1), Duration::from_millis(100));
        assert_eq!(interval.wait_for(5), Duration::from_millis(100));
    }

    #[test]
    fn test_cap_bounds_delay() {
        let interval = IntervalFn::exponential(Duration::from_millis(100))
            .with_cap(Duration::from_millis(500));

        assert_eq!(interval.wait_for(3), Duration::from_millis(400));
        assert_eq!(interval.wait_for(4), Duration::from_millis(500));
        assert_eq!(interval.wait_for(20), Duration::from_millis(500));
    }

    #[test]
    fn test_attempt_zero_treated_as_one() {
        let interval = IntervalFn::exponential(Duration::from_millis(100));
        assert_eq!(interval.wait_for(0), interval.wait_for(1));
    }

    #[test]
    fn test_huge_attempt_does_not_panic() {
        let interval = IntervalFn::exponential(Duration::from_secs(1));
        // Overflows f64-to-Duration conversion; falls back to the cap or MAX.
        assert_eq!(interval.wait_for(u32::MAX), Duration::MAX);

        let capped = IntervalFn::exponential(Duration::from_secs(1)).with_cap(Duration::from_secs(30));
        assert_eq!(capped.wait_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_default_is_fixed_500ms() {
        let interval = IntervalFn::default();
        assert_eq!(interval.wait_for(1), DEFAULT_WAIT);
    }

    #[test]
    fn test_jitter_none_is_identity() {
        let interval = IntervalFn::fixed(Duration::from_millis(100));
        assert_eq!(interval.jittered_wait_for(1), Duration::from_millis(100));
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_proportional_jitter_stays_in_range() {
        let interval = IntervalFn::fixed(Duration::from_millis(100)).with_jitter(0.25);

        for _ in 0..100 {
            let d = interval.jittered_wait_for(1);
            assert!(d >= Duration::from_millis(75), "too small: {:?}", d);
            assert!(d <= Duration::from_millis(125), "too large: {:?}", d);
        }
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_full_jitter_never_exceeds_delay() {
        let interval = IntervalFn::exponential(Duration::from_millis(100)).with_full_jitter();

        for _ in 0..100 {
            assert!(interval.jittered_wait_for(3) <= Duration::from_millis(400));
        }
    }

    #[cfg(feature = "jitter")]
    #[test]
    fn test_jittered_delay_honors_cap() {
        let interval = IntervalFn::exponential(Duration::from_millis(100))
            .with_cap(Duration::from_millis(150))
            .with_jitter(1.0);

        for _ in 0..100 {
            assert!(interval.jittered_wait_for(4) <= Duration::from_millis(150));
        }
    }

    #[test]
    fn test_interval_is_clone_and_eq() {
        let interval = IntervalFn::exponential(Duration::from_millis(100))
            .with_cap(Duration::from_secs(1))
            .with_jitter(0.5);
        assert_eq!(interval, interval.clone());
    }
}
