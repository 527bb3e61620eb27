//! Fallback substitution for exhausted call sequences.
//!
//! A [`Fallback`] maps terminal errors to substitute results. It is the
//! explicit stand-in for aspect-style fallback wiring: handlers are plain
//! values registered per error kind, and [`decorate`] turns an operation
//! plus a retry instance into a callable of the identical shape with
//! fallback semantics applied after the engine gives up.
//!
//! Handlers form an ordered chain matched first-to-last, so register the
//! most specific error kinds first. An error no handler matches propagates
//! unchanged - failures are substituted or surfaced, never lost.
//!
//! # Example
//!
//! ```rust
//! use steadfast::{Fallback, Retry, RetryConfig};
//! use std::time::Duration;
//!
//! #[derive(Debug, PartialEq)]
//! enum FetchError {
//!     Timeout,
//!     Unauthorized,
//! }
//!
//! impl std::fmt::Display for FetchError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! let retry: Retry<String, FetchError> = Retry::new(
//!     "profile",
//!     RetryConfig::builder()
//!         .max_attempts(2)
//!         .wait(Duration::ZERO)
//!         .build()
//!         .unwrap(),
//! );
//!
//! let fallback = Fallback::new()
//!     .on(
//!         |e: &FetchError| matches!(e, FetchError::Timeout),
//!         |_: &FetchError| Ok("cached profile".to_string()),
//!     );
//!
//! // Timeouts exhaust the retries, then the handler substitutes a result.
//! let result = retry.call_with_fallback(|| Err(FetchError::Timeout), &fallback);
//! assert_eq!(result, Ok("cached profile".to_string()));
//!
//! // Unhandled kinds propagate unchanged.
//! let result = retry.call_with_fallback(|| Err(FetchError::Unauthorized), &fallback);
//! assert_eq!(result, Err(FetchError::Unauthorized));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::predicate::Predicate;
use crate::retry::Retry;

type Handler<T, E> = Arc<dyn Fn(&E) -> Result<T, E> + Send + Sync>;

/// An ordered chain of `(error kind, handler)` pairs.
///
/// The first handler whose predicate matches the terminal error wins;
/// register specific kinds before general ones. Handlers may themselves
/// fail, in which case their error propagates in place of the original.
pub struct Fallback<T, E> {
    handlers: Vec<(Arc<dyn Predicate<E>>, Handler<T, E>)>,
}

impl<T, E> Fallback<T, E> {
    /// An empty chain; every error propagates until handlers are added.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Append a handler for errors matching `kind`.
    ///
    /// Matching is first-registered-first-tried, so add the most specific
    /// kinds before catch-alls.
    pub fn on<P, H>(mut self, kind: P, handler: H) -> Self
    where
        P: Predicate<E> + 'static,
        H: Fn(&E) -> Result<T, E> + Send + Sync + 'static,
    {
        self.handlers.push((Arc::new(kind), Arc::new(handler)));
        self
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether the chain has no handlers.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Hand a terminal error to the first matching handler.
    ///
    /// Returns the handler's substitute result, or `Err(error)` unchanged
    /// when no handler matches.
    pub fn handle(&self, error: E) -> Result<T, E> {
        for (kind, handler) in &self.handlers {
            if kind.check(&error) {
                return handler(&error);
            }
        }
        Err(error)
    }
}

impl<T, E> Default for Fallback<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for Fallback<T, E> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Fallback<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallback")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Wrap `operation` so every invocation runs under `retry` with `fallback`
/// applied to terminal errors.
///
/// The returned closure has the identical input/output shape as
/// `operation`. Fallback is consulted only once the engine reports a
/// terminal failed or ignored outcome - an in-progress retry sequence is
/// never interrupted.
///
/// # Example
///
/// ```rust
/// use steadfast::{decorate, Fallback, Retry, RetryConfig};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let retry: Arc<Retry<u32, String>> = Arc::new(Retry::new(
///     "lookup",
///     RetryConfig::builder()
///         .max_attempts(2)
///         .wait(Duration::ZERO)
///         .build()
///         .unwrap(),
/// ));
///
/// let fallback = Fallback::new().on(|_: &String| true, |_: &String| Ok(0));
///
/// let mut lookup = decorate(retry, fallback, || Err("down".to_string()));
/// assert_eq!(lookup(), Ok(0));
/// assert_eq!(lookup(), Ok(0)); // each invocation is a fresh sequence
/// ```
pub fn decorate<T, E, F>(
    retry: Arc<Retry<T, E>>,
    fallback: Fallback<T, E>,
    mut operation: F,
) -> impl FnMut() -> Result<T, E>
where
    E: fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    move || retry.call_with_fallback(&mut operation, &fallback)
}
