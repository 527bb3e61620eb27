//! The per-call state machine.

use std::fmt;
use std::time::Duration;

use crate::event::EventKind;
use crate::retry::engine::Retry;

/// What the engine decided after a failed attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision<E> {
    /// Wait for `wait`, then run the next attempt.
    Retry {
        /// How long to wait before the next attempt.
        wait: Duration,
    },
    /// Attempts are exhausted or the error did not qualify for retry; the
    /// error is handed back for the caller or a fallback.
    Fail(E),
    /// The error matched an ignore rule; it is handed back immediately,
    /// with no retry attempted.
    Ignored(E),
}

/// What the engine decided about a produced result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultDecision {
    /// The result is accepted; finish the sequence with
    /// [`RetryContext::on_success`].
    Accept,
    /// The result was rejected; wait for `wait`, then run the next attempt.
    Retry {
        /// How long to wait before the next attempt.
        wait: Duration,
    },
    /// The result was rejected but attempts are exhausted; the sequence is
    /// terminal and the last result belongs to the caller.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Active,
    Success,
    Failed,
    Ignored,
}

/// Per-invocation attempt state, created by [`Retry::context`].
///
/// Owned exclusively by one call sequence; the engine refuses to reuse a
/// context once it reaches a terminal state. Drivers feed each attempt's
/// outcome into [`on_success`](Self::on_success) /
/// [`on_error`](Self::on_error) / [`on_result`](Self::on_result) and obey
/// the returned decision.
pub struct RetryContext<'a, T, E> {
    retry: &'a Retry<T, E>,
    attempt: u32,
    state: State,
    last_error: Option<E>,
}

impl<'a, T, E> RetryContext<'a, T, E> {
    pub(crate) fn new(retry: &'a Retry<T, E>) -> Self {
        Self {
            retry,
            attempt: 1,
            state: State::Active,
            last_error: None,
        }
    }

    /// The current attempt number (1-indexed).
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Whether the sequence has ended.
    pub fn is_terminal(&self) -> bool {
        self.state != State::Active
    }

    /// The error from the most recent failed-and-retried attempt, if any.
    pub fn last_error(&self) -> Option<&E> {
        self.last_error.as_ref()
    }

    /// Consume the context, yielding the stored last error.
    pub fn into_last_error(self) -> Option<E> {
        self.last_error
    }

    fn ensure_active(&self, operation: &str) {
        if self.state != State::Active {
            panic!(
                "{} called on a terminal retry context for '{}' (state {:?}): \
                 contexts drive exactly one call sequence",
                operation,
                self.retry.name(),
                self.state
            );
        }
    }

    fn record_terminal_failure(&self) {
        self.retry.counters().record_failure(self.attempt > 1);
    }

    /// Mark the sequence successfully finished on the current attempt.
    ///
    /// Records the success metric (with or without retry, depending on the
    /// attempt number) and emits a `Success` event carrying the final
    /// attempt number.
    ///
    /// # Panics
    ///
    /// If the context is already terminal - calling any transition on a
    /// finished context is a caller bug, reported loudly rather than
    /// swallowed.
    pub fn on_success(&mut self) {
        self.ensure_active("on_success");
        self.state = State::Success;
        self.retry.counters().record_success(self.attempt > 1);
        self.retry.publish(self.attempt, EventKind::Success);
    }

    /// Classify a rejected-or-accepted result.
    ///
    /// With no result predicate configured, or a predicate the value does
    /// not match, the result is accepted and the context stays active for
    /// [`on_success`](Self::on_success). A rejected result follows the same
    /// state machine as a retryable error, minus the error payload.
    ///
    /// # Panics
    ///
    /// If the context is already terminal.
    pub fn on_result(&mut self, value: &T) -> ResultDecision {
        self.ensure_active("on_result");
        let config = self.retry.config();
        if !config.should_retry_result(value) {
            return ResultDecision::Accept;
        }

        if self.attempt < config.max_attempts() {
            let failed = self.attempt;
            let wait = config.interval().jittered_wait_for(failed);
            self.retry
                .publish(failed, EventKind::Retry { error: None, wait });
            #[cfg(feature = "tracing")]
            tracing::debug!(
                retry = self.retry.name(),
                attempt = failed,
                wait_ms = wait.as_millis() as u64,
                "result rejected, scheduling retry"
            );
            self.attempt = failed + 1;
            ResultDecision::Retry { wait }
        } else {
            self.state = State::Failed;
            self.record_terminal_failure();
            self.retry
                .publish(self.attempt, EventKind::Error { error: None });
            #[cfg(feature = "tracing")]
            tracing::warn!(
                retry = self.retry.name(),
                attempts = self.attempt,
                "attempts exhausted with a rejected result"
            );
            ResultDecision::Exhausted
        }
    }
}

impl<'a, T, E: fmt::Display> RetryContext<'a, T, E> {
    /// Classify a failed attempt.
    ///
    /// Ignore rules win: a matching error terminates the sequence at once
    /// with one `IgnoredError` event and no retry, and is handed back via
    /// [`RetryDecision::Ignored`]. Otherwise, while attempts remain and the
    /// error qualifies (no retry predicate means retry-by-default), a
    /// `Retry` event is emitted and the decision carries the wait for the
    /// next attempt. Anything else terminates the sequence with an `Error`
    /// event and [`RetryDecision::Fail`].
    ///
    /// The error value always comes back to the caller on terminal
    /// decisions, unchanged, so failure kinds stay matchable downstream.
    ///
    /// # Panics
    ///
    /// If the context is already terminal.
    pub fn on_error(&mut self, error: E) -> RetryDecision<E> {
        self.ensure_active("on_error");
        let config = self.retry.config();

        if config.is_ignored(&error) {
            self.state = State::Ignored;
            self.retry.counters().record_failure(false);
            self.retry.publish(
                self.attempt,
                EventKind::IgnoredError {
                    error: error.to_string(),
                },
            );
            #[cfg(feature = "tracing")]
            tracing::debug!(
                retry = self.retry.name(),
                attempt = self.attempt,
                "error matched an ignore rule, not retrying"
            );
            return RetryDecision::Ignored(error);
        }

        if self.attempt < config.max_attempts() && config.should_retry_error(&error) {
            let failed = self.attempt;
            let wait = config.interval().jittered_wait_for(failed);
            self.retry.publish(
                failed,
                EventKind::Retry {
                    error: Some(error.to_string()),
                    wait,
                },
            );
            #[cfg(feature = "tracing")]
            tracing::debug!(
                retry = self.retry.name(),
                attempt = failed,
                wait_ms = wait.as_millis() as u64,
                error = %error,
                "attempt failed, scheduling retry"
            );
            self.attempt = failed + 1;
            self.last_error = Some(error);
            return RetryDecision::Retry { wait };
        }

        self.state = State::Failed;
        self.record_terminal_failure();
        self.retry.publish(
            self.attempt,
            EventKind::Error {
                error: Some(error.to_string()),
            },
        );
        #[cfg(feature = "tracing")]
        tracing::warn!(
            retry = self.retry.name(),
            attempts = self.attempt,
            error = %error,
            "giving up"
        );
        RetryDecision::Fail(error)
    }
}

impl<'a, T, E> fmt::Debug for RetryContext<'a, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryContext")
            .field("retry", &self.retry.name())
            .field("attempt", &self.attempt)
            .field("state", &self.state)
            .finish()
    }
}
