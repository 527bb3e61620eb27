//! Retry policy configuration.
//!
//! A [`RetryConfig`] is immutable once built and shared by reference across
//! every call that uses the same named retry instance. It bundles the attempt
//! bound, the wait-interval function, and the classification rules that
//! decide which errors are retried, which are ignored outright, and which
//! results count as soft failures.
//!
//! # Example
//!
//! ```rust
//! use steadfast::{IntervalFn, RetryConfig};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! enum ApiError {
//!     Timeout,
//!     Unauthorized,
//! }
//!
//! let config: RetryConfig<String, ApiError> = RetryConfig::builder()
//!     .max_attempts(4)
//!     .interval(IntervalFn::exponential(Duration::from_millis(100)))
//!     .retry_on(|e: &ApiError| matches!(e, ApiError::Timeout))
//!     .ignore(|e: &ApiError| matches!(e, ApiError::Unauthorized))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.max_attempts(), 4);
//! assert!(config.should_retry_error(&ApiError::Timeout));
//! assert!(config.is_ignored(&ApiError::Unauthorized));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::interval::IntervalFn;
use crate::predicate::Predicate;

#[cfg(feature = "serde")]
mod settings;

#[cfg(feature = "serde")]
pub use settings::{BackoffSettings, RetrySettings};

/// Default number of attempts when none is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

type ErrorRule<E> = Arc<dyn Predicate<E>>;
type ResultRule<T> = Arc<dyn Predicate<T>>;

/// Immutable retry policy: attempt bound, wait intervals, and
/// error/result classification.
///
/// `T` is the output type of the protected operation (consulted by the
/// result predicate, if any); `E` is its error type. Build one with
/// [`RetryConfig::builder`] or take the defaults with
/// [`RetryConfig::of_defaults`] (3 attempts, 500ms fixed wait, every error
/// retried, none ignored).
pub struct RetryConfig<T, E> {
    max_attempts: u32,
    interval: IntervalFn,
    retry_on: Option<ErrorRule<E>>,
    ignore: Vec<ErrorRule<E>>,
    retry_on_result: Option<ResultRule<T>>,
}

impl<T, E> RetryConfig<T, E> {
    /// Start building a config.
    pub fn builder() -> RetryConfigBuilder<T, E> {
        RetryConfigBuilder::new()
    }

    /// The default policy: [`DEFAULT_MAX_ATTEMPTS`] attempts, a fixed
    /// [`DEFAULT_WAIT`](crate::interval::DEFAULT_WAIT) between them, every
    /// error retried, none ignored, results never rejected.
    pub fn of_defaults() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: IntervalFn::default(),
            retry_on: None,
            ignore: Vec::new(),
            retry_on_result: None,
        }
    }

    /// Maximum number of attempts, including the first (always ≥ 1).
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The wait-interval function applied between attempts.
    pub fn interval(&self) -> &IntervalFn {
        &self.interval
    }

    /// Whether the error matches an ignore rule.
    ///
    /// Ignore rules take precedence over
    /// [`should_retry_error`](Self::should_retry_error): an ignored error is
    /// never retried, regardless of the retry predicate, and surfaces
    /// immediately.
    pub fn is_ignored(&self, error: &E) -> bool {
        self.ignore.iter().any(|rule| rule.check(error))
    }

    /// Whether the error qualifies for another attempt.
    ///
    /// With no retry predicate configured, every error qualifies
    /// (retry-by-default). Ignore rules are checked separately and first;
    /// see [`is_ignored`](Self::is_ignored).
    pub fn should_retry_error(&self, error: &E) -> bool {
        match &self.retry_on {
            Some(rule) => rule.check(error),
            None => true,
        }
    }

    /// Whether the result counts as a soft failure to retry.
    ///
    /// With no result predicate configured, every result is accepted.
    pub fn should_retry_result(&self, value: &T) -> bool {
        match &self.retry_on_result {
            Some(rule) => rule.check(value),
            None => false,
        }
    }
}

impl<T, E> Default for RetryConfig<T, E> {
    fn default() -> Self {
        Self::of_defaults()
    }
}

impl<T, E> Clone for RetryConfig<T, E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            interval: self.interval.clone(),
            retry_on: self.retry_on.clone(),
            ignore: self.ignore.clone(),
            retry_on_result: self.retry_on_result.clone(),
        }
    }
}

impl<T, E> fmt::Debug for RetryConfig<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("max_attempts", &self.max_attempts)
            .field("interval", &self.interval)
            .field("retry_on", &self.retry_on.as_ref().map(|_| "<predicate>"))
            .field("ignore_rules", &self.ignore.len())
            .field(
                "retry_on_result",
                &self.retry_on_result.as_ref().map(|_| "<predicate>"),
            )
            .finish()
    }
}

/// Builder for [`RetryConfig`].
///
/// # Example
///
/// ```rust
/// use steadfast::{ConfigError, RetryConfig};
///
/// let err = RetryConfig::<(), String>::builder()
///     .max_attempts(0)
///     .build()
///     .unwrap_err();
///
/// assert_eq!(err, ConfigError::InvalidMaxAttempts(0));
/// ```
pub struct RetryConfigBuilder<T, E> {
    max_attempts: u32,
    interval: IntervalFn,
    retry_on: Option<ErrorRule<E>>,
    ignore: Vec<ErrorRule<E>>,
    retry_on_result: Option<ResultRule<T>>,
}

impl<T, E> RetryConfigBuilder<T, E> {
    fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: IntervalFn::default(),
            retry_on: None,
            ignore: Vec::new(),
            retry_on_result: None,
        }
    }

    /// Set the maximum number of attempts, including the first.
    ///
    /// Validated at [`build`](Self::build): zero is rejected.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the wait-interval function.
    pub fn interval(mut self, interval: IntervalFn) -> Self {
        self.interval = interval;
        self
    }

    /// Shorthand for a fixed wait between attempts.
    pub fn wait(mut self, duration: Duration) -> Self {
        self.interval = IntervalFn::fixed(duration);
        self
    }

    /// Retry only errors matching the predicate.
    ///
    /// Without this, every non-ignored error is retried.
    pub fn retry_on<P>(mut self, rule: P) -> Self
    where
        P: Predicate<E> + 'static,
    {
        self.retry_on = Some(Arc::new(rule));
        self
    }

    /// Never retry errors matching the predicate; they surface immediately.
    ///
    /// May be called multiple times; the rules form an ordered chain and any
    /// match ignores the error. Ignore rules win over
    /// [`retry_on`](Self::retry_on).
    pub fn ignore<P>(mut self, rule: P) -> Self
    where
        P: Predicate<E> + 'static,
    {
        self.ignore.push(Arc::new(rule));
        self
    }

    /// Treat results matching the predicate as soft failures to retry.
    pub fn retry_on_result<P>(mut self, rule: P) -> Self
    where
        P: Predicate<T> + 'static,
    {
        self.retry_on_result = Some(Arc::new(rule));
        self
    }

    /// Validate and build the config.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidMaxAttempts`] if `max_attempts` is zero.
    pub fn build(self) -> Result<RetryConfig<T, E>, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(self.max_attempts));
        }
        Ok(RetryConfig {
            max_attempts: self.max_attempts,
            interval: self.interval,
            retry_on: self.retry_on,
            ignore: self.ignore,
            retry_on_result: self.retry_on_result,
        })
    }
}

impl<T, E> Default for RetryConfigBuilder<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for RetryConfigBuilder<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfigBuilder")
            .field("max_attempts", &self.max_attempts)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Error rejecting an invalid config at construction time.
///
/// Construction-time validation is fatal: no retry instance is created from
/// a config that failed to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_attempts` must be at least 1.
    InvalidMaxAttempts(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidMaxAttempts(n) => {
                write!(f, "max_attempts must be at least 1 (got {})", n)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Permanent,
        Auth,
    }

    #[test]
    fn test_defaults() {
        let config: RetryConfig<(), TestError> = RetryConfig::of_defaults();
        assert_eq!(config.max_attempts(), 3);
        assert_eq!(
            config.interval().wait_for(1),
            crate::interval::DEFAULT_WAIT
        );
    }

    #[test]
    fn test_build_rejects_zero_attempts() {
        let result = RetryConfig::<(), TestError>::builder().max_attempts(0).build();
        assert_eq!(result.unwrap_err(), ConfigError::InvalidMaxAttempts(0));
    }

    #[test]
    fn test_build_accepts_single_attempt() {
        let config = RetryConfig::<(), TestError>::builder()
            .max_attempts(1)
            .build()
            .unwrap();
        assert_eq!(config.max_attempts(), 1);
    }

    #[test]
    fn test_retry_by_default() {
        let config: RetryConfig<(), TestError> = RetryConfig::of_defaults();
        assert!(config.should_retry_error(&TestError::Transient));
        assert!(config.should_retry_error(&TestError::Permanent));
    }

    #[test]
    fn test_retry_predicate_limits_retries() {
        let config = RetryConfig::<(), TestError>::builder()
            .retry_on(|e: &TestError| matches!(e, TestError::Transient))
            .build()
            .unwrap();

        assert!(config.should_retry_error(&TestError::Transient));
        assert!(!config.should_retry_error(&TestError::Permanent));
    }

    #[test]
    fn test_ignore_rules_chain() {
        let config = RetryConfig::<(), TestError>::builder()
            .ignore(|e: &TestError| matches!(e, TestError::Auth))
            .ignore(|e: &TestError| matches!(e, TestError::Permanent))
            .build()
            .unwrap();

        assert!(config.is_ignored(&TestError::Auth));
        assert!(config.is_ignored(&TestError::Permanent));
        assert!(!config.is_ignored(&TestError::Transient));
    }

    #[test]
    fn test_ignore_wins_over_retry_on() {
        // An error matching both rules: classification must treat it as
        // ignored, never retried.
        let config = RetryConfig::<(), TestError>::builder()
            .retry_on(|_: &TestError| true)
            .ignore(|e: &TestError| matches!(e, TestError::Auth))
            .build()
            .unwrap();

        assert!(config.is_ignored(&TestError::Auth));
        assert!(config.should_retry_error(&TestError::Auth));
    }

    #[test]
    fn test_result_predicate() {
        let config = RetryConfig::<u32, TestError>::builder()
            .retry_on_result(|status: &u32| *status >= 500)
            .build()
            .unwrap();

        assert!(config.should_retry_result(&503));
        assert!(!config.should_retry_result(&200));
    }

    #[test]
    fn test_results_accepted_without_predicate() {
        let config: RetryConfig<u32, TestError> = RetryConfig::of_defaults();
        assert!(!config.should_retry_result(&503));
    }

    #[test]
    fn test_config_is_clone() {
        let config = RetryConfig::<(), TestError>::builder()
            .max_attempts(5)
            .retry_on(|e: &TestError| matches!(e, TestError::Transient))
            .build()
            .unwrap();
        let cloned = config.clone();
        assert_eq!(cloned.max_attempts(), 5);
        assert!(cloned.should_retry_error(&TestError::Transient));
        assert!(!cloned.should_retry_error(&TestError::Permanent));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidMaxAttempts(0);
        assert!(format!("{}", err).contains("at least 1"));
    }

    #[test]
    fn test_config_is_debug() {
        let config: RetryConfig<(), TestError> = RetryConfig::of_defaults();
        let debug = format!("{:?}", config);
        assert!(debug.contains("RetryConfig"));
    }
}
