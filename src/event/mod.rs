//! Retry lifecycle events and their publication.
//!
//! Every call sequence driven by a retry instance emits typed events:
//! a terminal `Success`, a `Retry` per scheduled re-attempt, a terminal
//! `Error` on exhaustion, or a terminal `IgnoredError` when an ignore rule
//! short-circuits the sequence. Events flow one way - from the engine out to
//! listeners and buffers - and never influence retry decisions.
//!
//! Causing errors are carried in rendered form (their `Display` output):
//! events are an observability sink, while the typed error value itself is
//! returned on the call path, where callers and fallback handlers match on
//! the real type.
//!
//! # Example
//!
//! ```rust
//! use steadfast::{EventKind, Retry, RetryConfig};
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//!
//! let retry: Retry<(), String> = Retry::new(
//!     "flaky",
//!     RetryConfig::builder()
//!         .max_attempts(2)
//!         .wait(Duration::ZERO)
//!         .build()
//!         .unwrap(),
//! );
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! retry.publisher().subscribe(move |event| {
//!     sink.lock().unwrap().push(event.kind.clone());
//! });
//!
//! let _ = retry.call(|| Err::<(), _>("boom".to_string()));
//!
//! let kinds = seen.lock().unwrap();
//! assert!(matches!(kinds[0], EventKind::Retry { .. }));
//! assert!(matches!(kinds[1], EventKind::Error { .. }));
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime};

mod consumer;

pub use consumer::{EventConsumer, EventConsumerRegistry, DEFAULT_BUFFER_CAPACITY};

/// One occurrence in a retry call sequence.
///
/// Immutable; ordering is emission order per call sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryEvent {
    /// Name of the retry instance that emitted the event.
    pub name: Arc<str>,
    /// Attempt number the event refers to (1-indexed).
    pub attempt: u32,
    /// When the event was created.
    pub created_at: SystemTime,
    /// What happened.
    pub kind: EventKind,
}

/// The variants of a [`RetryEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// The call sequence ended successfully on the given attempt.
    Success,
    /// The attempt failed and another will follow after `wait`.
    ///
    /// `error` is absent when the retry was triggered by a rejected result
    /// rather than an error.
    Retry {
        /// Rendered causing error, if the attempt failed with one.
        error: Option<String>,
        /// Wait before the next attempt.
        wait: Duration,
    },
    /// Attempts are exhausted (or the error did not qualify for retry);
    /// the sequence ended in failure.
    ///
    /// `error` is absent when the terminal failure was a rejected result.
    Error {
        /// Rendered final error, if the sequence ended with one.
        error: Option<String>,
    },
    /// The error matched an ignore rule; no retry was attempted.
    IgnoredError {
        /// Rendered ignored error.
        error: String,
    },
}

impl RetryEvent {
    pub(crate) fn new(name: Arc<str>, attempt: u32, kind: EventKind) -> Self {
        Self {
            name,
            attempt,
            created_at: SystemTime::now(),
            kind,
        }
    }
}

impl fmt::Display for RetryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EventKind::Success => {
                write!(f, "retry '{}' succeeded on attempt {}", self.name, self.attempt)
            }
            EventKind::Retry { error, wait } => match error {
                Some(e) => write!(
                    f,
                    "retry '{}' attempt {} failed ({}), retrying in {:?}",
                    self.name, self.attempt, e, wait
                ),
                None => write!(
                    f,
                    "retry '{}' attempt {} rejected its result, retrying in {:?}",
                    self.name, self.attempt, wait
                ),
            },
            EventKind::Error { error } => match error {
                Some(e) => write!(
                    f,
                    "retry '{}' failed after {} attempts: {}",
                    self.name, self.attempt, e
                ),
                None => write!(
                    f,
                    "retry '{}' exhausted {} attempts with a rejected result",
                    self.name, self.attempt
                ),
            },
            EventKind::IgnoredError { error } => write!(
                f,
                "retry '{}' ignored an error on attempt {}: {}",
                self.name, self.attempt, error
            ),
        }
    }
}

type Listener = Arc<dyn Fn(&RetryEvent) + Send + Sync>;

/// Per-instance fan-out of [`RetryEvent`]s to subscribed listeners.
///
/// Delivery is synchronous and in emission order, once to each listener
/// subscribed at publication time. The listener list is copy-on-write:
/// publication iterates a snapshot, so subscribing never blocks concurrent
/// publishers and publishing never blocks other instances.
pub struct EventPublisher {
    listeners: RwLock<Arc<Vec<Listener>>>,
}

impl EventPublisher {
    pub(crate) fn new() -> Self {
        Self {
            listeners: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Subscribe a listener to every subsequent event from this instance.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        let mut guard = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(Arc::new(listener));
        *guard = Arc::new(next);
    }

    /// Number of subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn publish(&self, event: &RetryEvent) {
        let snapshot = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in snapshot.iter() {
            listener(event);
        }
    }
}

impl fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn event(kind: EventKind) -> RetryEvent {
        RetryEvent::new(Arc::from("test"), 1, kind)
    }

    #[test]
    fn test_publish_reaches_all_listeners() {
        let publisher = EventPublisher::new();
        let first = Arc::new(Mutex::new(0u32));
        let second = Arc::new(Mutex::new(0u32));

        let sink = first.clone();
        publisher.subscribe(move |_| *sink.lock().unwrap() += 1);
        let sink = second.clone();
        publisher.subscribe(move |_| *sink.lock().unwrap() += 1);

        publisher.publish(&event(EventKind::Success));

        assert_eq!(*first.lock().unwrap(), 1);
        assert_eq!(*second.lock().unwrap(), 1);
    }

    #[test]
    fn test_listener_sees_only_future_events() {
        let publisher = EventPublisher::new();
        publisher.publish(&event(EventKind::Success));

        let count = Arc::new(Mutex::new(0u32));
        let sink = count.clone();
        publisher.subscribe(move |_| *sink.lock().unwrap() += 1);

        publisher.publish(&event(EventKind::Success));
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_delivery_in_emission_order() {
        let publisher = EventPublisher::new();
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let sink = attempts.clone();
        publisher.subscribe(move |e| sink.lock().unwrap().push(e.attempt));

        for attempt in 1..=3 {
            publisher.publish(&RetryEvent::new(Arc::from("test"), attempt, EventKind::Success));
        }

        assert_eq!(*attempts.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_event_display_forms() {
        let success = event(EventKind::Success);
        assert!(format!("{}", success).contains("succeeded"));

        let retrying = event(EventKind::Retry {
            error: Some("timeout".to_string()),
            wait: Duration::from_millis(100),
        });
        let rendered = format!("{}", retrying);
        assert!(rendered.contains("timeout"));
        assert!(rendered.contains("retrying"));

        let ignored = event(EventKind::IgnoredError {
            error: "bad credentials".to_string(),
        });
        assert!(format!("{}", ignored).contains("ignored"));
    }
}
