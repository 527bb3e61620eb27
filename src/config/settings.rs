//! Plain-data retry settings for configuration interchange (feature-gated).
//!
//! The engine consumes built [`RetryConfig`] values; it never parses
//! configuration text itself. This module is the boundary object for layers
//! that do: a serde-friendly mapping of the usual retry knobs, convertible
//! into a config. Predicates cannot be expressed as data and are attached in
//! code after conversion.
//!
//! # Example
//!
//! ```rust,ignore
//! use steadfast::{RetryConfig, RetrySettings};
//!
//! let settings: RetrySettings = serde_json::from_str(
//!     r#"{"max_attempts": 5, "wait_millis": 100, "backoff": {"multiplier": 2.0}}"#,
//! )?;
//!
//! let config: RetryConfig<(), std::io::Error> = settings.to_config()?;
//! assert_eq!(config.max_attempts(), 5);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigError, RetryConfig, DEFAULT_MAX_ATTEMPTS};
use crate::interval::{IntervalFn, DEFAULT_WAIT};

/// Declarative retry settings, as produced by a configuration layer.
///
/// Missing fields take the engine defaults (3 attempts, 500ms wait).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Base wait between attempts, in milliseconds.
    pub wait_millis: u64,
    /// Exponential backoff, if any; absent means a fixed wait.
    pub backoff: Option<BackoffSettings>,
}

/// Exponential backoff settings layered on top of the base wait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffSettings {
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Upper bound on the wait, in milliseconds, if any.
    pub max_wait_millis: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait_millis: DEFAULT_WAIT.as_millis() as u64,
            backoff: None,
        }
    }
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            multiplier: 2.0,
            max_wait_millis: None,
        }
    }
}

impl RetrySettings {
    /// The wait-interval function these settings describe.
    pub fn interval(&self) -> IntervalFn {
        let base = Duration::from_millis(self.wait_millis);
        match &self.backoff {
            None => IntervalFn::fixed(base),
            Some(backoff) => {
                let mut interval =
                    IntervalFn::exponential(base).with_multiplier(backoff.multiplier);
                if let Some(max) = backoff.max_wait_millis {
                    interval = interval.with_cap(Duration::from_millis(max));
                }
                interval
            }
        }
    }

    /// Convert into a built [`RetryConfig`].
    ///
    /// Classification predicates are code, not data; attach them by going
    /// through [`RetryConfig::builder`] with [`interval`](Self::interval)
    /// instead when they are needed.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidMaxAttempts`] if `max_attempts` is zero.
    pub fn to_config<T, E>(&self) -> Result<RetryConfig<T, E>, ConfigError> {
        RetryConfig::builder()
            .max_attempts(self.max_attempts)
            .interval(self.interval())
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings: RetrySettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.max_attempts, 3);
        assert_eq!(settings.wait_millis, 500);
        assert!(settings.backoff.is_none());
    }

    #[test]
    fn test_fixed_wait_conversion() {
        let settings: RetrySettings =
            serde_json::from_str(r#"{"max_attempts": 5, "wait_millis": 100}"#).unwrap();
        let config: RetryConfig<(), String> = settings.to_config().unwrap();

        assert_eq!(config.max_attempts(), 5);
        assert_eq!(config.interval().wait_for(1), Duration::from_millis(100));
        assert_eq!(config.interval().wait_for(4), Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_conversion() {
        let settings: RetrySettings = serde_json::from_str(
            r#"{
                "wait_millis": 100,
                "backoff": {"multiplier": 2.0, "max_wait_millis": 300}
            }"#,
        )
        .unwrap();
        let interval = settings.interval();

        assert_eq!(interval.wait_for(1), Duration::from_millis(100));
        assert_eq!(interval.wait_for(2), Duration::from_millis(200));
        assert_eq!(interval.wait_for(3), Duration::from_millis(300)); // capped
    }

    #[test]
    fn test_backoff_defaults_to_doubling() {
        let settings: RetrySettings =
            serde_json::from_str(r#"{"wait_millis": 100, "backoff": {}}"#).unwrap();
        assert_eq!(settings.interval().wait_for(2), Duration::from_millis(200));
    }

    #[test]
    fn test_zero_attempts_rejected_at_conversion() {
        let settings: RetrySettings = serde_json::from_str(r#"{"max_attempts": 0}"#).unwrap();
        let result: Result<RetryConfig<(), String>, _> = settings.to_config();
        assert_eq!(result.unwrap_err(), ConfigError::InvalidMaxAttempts(0));
    }

    #[test]
    fn test_settings_round_trip() {
        let settings = RetrySettings {
            max_attempts: 4,
            wait_millis: 250,
            backoff: Some(BackoffSettings {
                multiplier: 1.5,
                max_wait_millis: Some(2_000),
            }),
        };

        let json = serde_json::to_string(&settings).unwrap();
        let back: RetrySettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
