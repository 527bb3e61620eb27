//! # Steadfast
//!
//! > *"Fail, wait, try again - deliberately."*
//!
//! A Rust library for retry-on-failure semantics around arbitrary
//! operations: named policies, backoff intervals, error classification,
//! lifecycle events, and fallback substitution.
//!
//! ## Philosophy
//!
//! **Steadfast** keeps a **pure policy core** behind an **imperative
//! shell**:
//!
//! - Policies ([`RetryConfig`], [`IntervalFn`]) are plain data - no side
//!   effects, easy to test and share.
//! - The engine ([`Retry`], [`RetryContext`]) is a per-call state machine
//!   that only *decides*; sleeping and invoking the protected operation
//!   belong to thin drivers ([`Retry::call`], `Retry::call_async`) or to
//!   your own loop.
//! - Observability ([`RetryEvent`], [`EventConsumerRegistry`]) is a pure
//!   sink: events flow out, nothing flows back in.
//!
//! ## Quick Example
//!
//! ```rust
//! use steadfast::{Fallback, IntervalFn, RetryConfig, RetryRegistry};
//! use std::time::Duration;
//!
//! let registry: RetryRegistry<String, std::io::Error> = RetryRegistry::of_defaults();
//!
//! let retry = registry.retry_with_config(
//!     "user-service",
//!     RetryConfig::builder()
//!         .max_attempts(4)
//!         .interval(IntervalFn::exponential(Duration::from_millis(1)))
//!         .retry_on(|e: &std::io::Error| e.kind() == std::io::ErrorKind::TimedOut)
//!         .build()
//!         .unwrap(),
//! );
//!
//! let fallback = Fallback::new().on(
//!     |e: &std::io::Error| e.kind() == std::io::ErrorKind::TimedOut,
//!     |_: &std::io::Error| Ok("cached user".to_string()),
//! );
//!
//! let result = retry.call_with_fallback(
//!     || Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "no response")),
//!     &fallback,
//! );
//!
//! assert_eq!(result.unwrap(), "cached user");
//! assert_eq!(retry.metrics().failed_with_retry, 1);
//! ```
//!
//! ## Features
//!
//! - `async` - `tokio`-based async drivers (`Retry::call_async`)
//! - `jitter` - randomized backoff via `rand`
//! - `tracing` - engine-level `tracing` output on retries and exhaustion
//! - `serde` - plain-data `RetrySettings` for configuration interchange

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod event;
pub mod fallback;
pub mod interval;
pub mod predicate;
pub mod registry;
pub mod retry;

// Re-exports
pub use config::{ConfigError, RetryConfig, RetryConfigBuilder};
pub use event::{EventConsumer, EventConsumerRegistry, EventKind, EventPublisher, RetryEvent};
pub use fallback::{decorate, Fallback};
pub use interval::{IntervalFn, JitterStrategy, WaitStrategy};
pub use registry::RetryRegistry;
pub use retry::{MetricsSnapshot, ResultDecision, Retry, RetryContext, RetryDecision};

#[cfg(feature = "serde")]
pub use config::{BackoffSettings, RetrySettings};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ConfigError, RetryConfig, RetryConfigBuilder};
    pub use crate::event::{EventConsumerRegistry, EventKind, RetryEvent};
    pub use crate::fallback::{decorate, Fallback};
    pub use crate::interval::IntervalFn;
    pub use crate::predicate::{Predicate, PredicateExt};
    pub use crate::registry::RetryRegistry;
    pub use crate::retry::{MetricsSnapshot, ResultDecision, Retry, RetryContext, RetryDecision};
}
