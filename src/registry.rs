//! The named-instance registry.
//!
//! A [`RetryRegistry`] hands out shared [`Retry`] instances by name,
//! creating them lazily from its default config (or a caller-supplied one)
//! on first lookup. It is an explicitly constructed value - inject it where
//! it is needed; there is no process-wide singleton.
//!
//! Every instance the registry creates is wired to forward its events into
//! the registry's [`EventConsumerRegistry`], so telemetry can read per-name
//! event history without touching the instances themselves.
//!
//! # Example
//!
//! ```rust
//! use steadfast::RetryRegistry;
//! use std::sync::Arc;
//!
//! let registry: RetryRegistry<(), String> = RetryRegistry::of_defaults();
//!
//! let first = registry.retry("billing");
//! let second = registry.retry("billing");
//!
//! // Same shared instance for the same name.
//! assert!(Arc::ptr_eq(&first, &second));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::RetryConfig;
use crate::event::EventConsumerRegistry;
use crate::retry::Retry;

/// Name-keyed cache and factory of shared [`Retry`] instances.
///
/// At most one instance is ever live per name: lookups take a read lock on
/// the steady-state path and fall back to a create-if-absent write lock, so
/// a race between first callers resolves to a single winner internally and
/// is never surfaced.
pub struct RetryRegistry<T, E> {
    default_config: Arc<RetryConfig<T, E>>,
    entries: RwLock<HashMap<Arc<str>, Arc<Retry<T, E>>>>,
    consumers: Arc<EventConsumerRegistry>,
}

impl<T, E> RetryRegistry<T, E> {
    /// Registry whose unnamed-config lookups use `default_config`.
    pub fn new(default_config: RetryConfig<T, E>) -> Self {
        Self {
            default_config: Arc::new(default_config),
            entries: RwLock::new(HashMap::new()),
            consumers: Arc::new(EventConsumerRegistry::new()),
        }
    }

    /// Registry using [`RetryConfig::of_defaults`] as its default config.
    pub fn of_defaults() -> Self {
        Self::new(RetryConfig::of_defaults())
    }

    /// The registry's default config.
    pub fn default_config(&self) -> &RetryConfig<T, E> {
        &self.default_config
    }

    /// The event sink all registry-created instances publish into.
    pub fn event_consumers(&self) -> &Arc<EventConsumerRegistry> {
        &self.consumers
    }

    /// The instance registered under `name`, created with the registry's
    /// default config if absent.
    ///
    /// Concurrent callers racing on the same name all receive the identical
    /// instance.
    pub fn retry(&self, name: &str) -> Arc<Retry<T, E>> {
        self.lookup_or_create(name, || self.default_config.clone())
    }

    /// The instance registered under `name`, created with `config` if
    /// absent.
    ///
    /// First-writer-wins: when a race occurs, the first caller to install
    /// an instance decides its config and later configs are dropped.
    /// Configure before any concurrent lookups to avoid the ambiguity.
    pub fn retry_with_config(&self, name: &str, config: RetryConfig<T, E>) -> Arc<Retry<T, E>> {
        self.lookup_or_create(name, || Arc::new(config))
    }

    fn lookup_or_create<F>(&self, name: &str, config: F) -> Arc<Retry<T, E>>
    where
        F: FnOnce() -> Arc<RetryConfig<T, E>>,
    {
        if let Some(retry) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return retry.clone();
        }

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(Arc::from(name))
            .or_insert_with(|| {
                let retry = Arc::new(Retry::with_config(name, config()));
                let consumers = self.consumers.clone();
                retry
                    .publisher()
                    .subscribe(move |event| consumers.publish(event));
                retry
            })
            .clone()
    }

    /// Detach the instance registered under `name`, returning it if present.
    ///
    /// In-flight call sequences hold their own `Arc` and finish unaffected;
    /// the next lookup for the name creates a fresh instance.
    pub fn remove(&self, name: &str) -> Option<Arc<Retry<T, E>>> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// Snapshot of the registered names.
    pub fn names(&self) -> Vec<Arc<str>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no instances are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T, E> Default for RetryRegistry<T, E> {
    fn default() -> Self {
        Self::of_defaults()
    }
}

impl<T, E> fmt::Debug for RetryRegistry<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("RetryRegistry")
            .field("instances", &entries.len())
            .field("default_config", &self.default_config)
            .finish()
    }
}
