//! The retry engine: named instances, per-call contexts, and drivers.
//!
//! A [`Retry`] is a stateless policy holder identified by a name. It owns an
//! immutable [`RetryConfig`](crate::RetryConfig), a set of atomic outcome
//! counters, and an event publisher - nothing else is shared, so any number
//! of threads or tasks can drive calls through the same instance
//! concurrently.
//!
//! Each invocation gets a fresh [`RetryContext`] from [`Retry::context`];
//! the context is the per-call state machine that classifies every outcome
//! and decides whether to retry, wait, or give up. Contexts are never shared
//! across invocations, which is the invariant that keeps attempt state from
//! leaking between unrelated calls.
//!
//! Most callers never touch the context directly: [`Retry::call`] (and
//! [`Retry::call_async`] with the `async` feature) package the
//! context-driving loop, sleeping between attempts on the calling thread or
//! task only.
//!
//! # Quick start
//!
//! ```rust
//! use steadfast::{IntervalFn, Retry, RetryConfig};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//!
//! let retry: Retry<&str, String> = Retry::new(
//!     "remote-call",
//!     RetryConfig::builder()
//!         .max_attempts(3)
//!         .interval(IntervalFn::fixed(Duration::from_millis(1)))
//!         .build()
//!         .unwrap(),
//! );
//!
//! let attempts = AtomicU32::new(0);
//! let result = retry.call(|| {
//!     if attempts.fetch_add(1, Ordering::SeqCst) < 1 {
//!         Err("transient".to_string())
//!     } else {
//!         Ok("connected")
//!     }
//! });
//!
//! assert_eq!(result, Ok("connected"));
//! assert_eq!(retry.metrics().succeeded_with_retry, 1);
//! ```

mod context;
mod engine;

pub use context::{ResultDecision, RetryContext, RetryDecision};
pub use engine::{MetricsSnapshot, Retry};
