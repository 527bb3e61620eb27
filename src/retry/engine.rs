//! The named retry instance and its call drivers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::RetryConfig;
use crate::event::{EventKind, EventPublisher, RetryEvent};
use crate::fallback::Fallback;
use crate::retry::context::{ResultDecision, RetryContext, RetryDecision};

/// A named, shareable retry instance.
///
/// Holds the policy and the cross-call bookkeeping (metrics, event
/// publisher); all per-call state lives in the [`RetryContext`] created by
/// [`context`](Self::context). Instances are usually obtained from a
/// [`RetryRegistry`](crate::RetryRegistry) and shared via `Arc`, but
/// standalone construction is fine for code that manages its own instances.
pub struct Retry<T, E> {
    name: Arc<str>,
    config: Arc<RetryConfig<T, E>>,
    counters: Counters,
    publisher: EventPublisher,
}

impl<T, E> Retry<T, E> {
    /// Create an instance owning its config.
    pub fn new(name: impl Into<Arc<str>>, config: RetryConfig<T, E>) -> Self {
        Self::with_config(name, Arc::new(config))
    }

    /// Create an instance sharing an already-built config.
    pub fn with_config(name: impl Into<Arc<str>>, config: Arc<RetryConfig<T, E>>) -> Self {
        Self {
            name: name.into(),
            config,
            counters: Counters::default(),
            publisher: EventPublisher::new(),
        }
    }

    /// The instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The policy this instance applies.
    pub fn config(&self) -> &RetryConfig<T, E> {
        &self.config
    }

    /// The per-instance event publisher.
    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Snapshot of the outcome counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.counters.snapshot()
    }

    /// A fresh context for one call sequence.
    ///
    /// The context holds this invocation's attempt state exclusively; create
    /// one per call and drop it when the sequence ends. Most callers should
    /// use [`call`](Self::call) instead of driving the context by hand.
    pub fn context(&self) -> RetryContext<'_, T, E> {
        RetryContext::new(self)
    }

    pub(crate) fn publish(&self, attempt: u32, kind: EventKind) {
        self.publisher
            .publish(&RetryEvent::new(self.name.clone(), attempt, kind));
    }

    pub(crate) fn counters(&self) -> &Counters {
        &self.counters
    }
}

impl<T, E: fmt::Display> Retry<T, E> {
    /// Run `operation` under this policy, blocking the calling thread
    /// between attempts.
    ///
    /// Returns the first accepted result, or the final error once attempts
    /// are exhausted, the error fails to qualify for retry, or an ignore
    /// rule matches. A result still rejected by the result predicate when
    /// attempts run out is returned as-is.
    ///
    /// Only the calling thread waits; concurrent calls through the same
    /// instance are unaffected.
    pub fn call<F>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        let mut context = self.context();
        loop {
            match operation() {
                Ok(value) => match context.on_result(&value) {
                    ResultDecision::Accept => {
                        context.on_success();
                        return Ok(value);
                    }
                    ResultDecision::Retry { wait } => std::thread::sleep(wait),
                    ResultDecision::Exhausted => return Ok(value),
                },
                Err(error) => match context.on_error(error) {
                    RetryDecision::Retry { wait } => std::thread::sleep(wait),
                    RetryDecision::Fail(error) | RetryDecision::Ignored(error) => {
                        return Err(error)
                    }
                },
            }
        }
    }

    /// [`call`](Self::call), handing terminal errors to `fallback`.
    ///
    /// The fallback is consulted only after this instance reaches a terminal
    /// failed or ignored outcome - never mid-sequence. Errors no handler
    /// matches propagate unchanged.
    pub fn call_with_fallback<F>(&self, operation: F, fallback: &Fallback<T, E>) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        self.call(operation).or_else(|error| fallback.handle(error))
    }

    /// Run an async `operation` under this policy, suspending the calling
    /// task between attempts.
    ///
    /// Identical decision semantics to [`call`](Self::call); the wait is a
    /// `tokio::time::sleep`, so only this task is parked.
    #[cfg(feature = "async")]
    pub async fn call_async<F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut context = self.context();
        loop {
            match operation().await {
                Ok(value) => match context.on_result(&value) {
                    ResultDecision::Accept => {
                        context.on_success();
                        return Ok(value);
                    }
                    ResultDecision::Retry { wait } => tokio::time::sleep(wait).await,
                    ResultDecision::Exhausted => return Ok(value),
                },
                Err(error) => match context.on_error(error) {
                    RetryDecision::Retry { wait } => tokio::time::sleep(wait).await,
                    RetryDecision::Fail(error) | RetryDecision::Ignored(error) => {
                        return Err(error)
                    }
                },
            }
        }
    }

    /// [`call_async`](Self::call_async), handing terminal errors to
    /// `fallback`.
    #[cfg(feature = "async")]
    pub async fn call_async_with_fallback<F, Fut>(
        &self,
        operation: F,
        fallback: &Fallback<T, E>,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        match self.call_async(operation).await {
            Ok(value) => Ok(value),
            Err(error) => fallback.handle(error),
        }
    }
}

impl<T, E> fmt::Debug for Retry<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("metrics", &self.metrics())
            .finish()
    }
}

/// Cross-call outcome counters, incremented atomically.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    succeeded_without_retry: AtomicU64,
    succeeded_with_retry: AtomicU64,
    failed_without_retry: AtomicU64,
    failed_with_retry: AtomicU64,
}

impl Counters {
    pub(crate) fn record_success(&self, retried: bool) {
        if retried {
            self.succeeded_with_retry.fetch_add(1, Ordering::Relaxed);
        } else {
            self.succeeded_without_retry.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_failure(&self, retried: bool) {
        if retried {
            self.failed_with_retry.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_without_retry.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            succeeded_without_retry: self.succeeded_without_retry.load(Ordering::Relaxed),
            succeeded_with_retry: self.succeeded_with_retry.load(Ordering::Relaxed),
            failed_without_retry: self.failed_without_retry.load(Ordering::Relaxed),
            failed_with_retry: self.failed_with_retry.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a [`Retry`]'s outcome counters.
///
/// A call counts as "with retry" when it made more than one attempt.
/// Ignored errors count as failures without retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Calls that succeeded on the first attempt.
    pub succeeded_without_retry: u64,
    /// Calls that succeeded after at least one retry.
    pub succeeded_with_retry: u64,
    /// Calls that failed without any retry (including ignored errors).
    pub failed_without_retry: u64,
    /// Calls that failed after at least one retry.
    pub failed_with_retry: u64,
}
