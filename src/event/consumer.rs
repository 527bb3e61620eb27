//! Per-name buffered event consumers and listener fan-out.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::{Listener, RetryEvent};

/// Buffer capacity used when none is given to
/// [`EventConsumerRegistry::consumer_with_capacity`].
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// A bounded buffer of the most recent events for one retry name.
///
/// Capacity is fixed at creation; once full, the oldest event is evicted
/// first. Reading returns events oldest-first (most-recent-last).
pub struct EventConsumer {
    capacity: usize,
    buffer: Mutex<VecDeque<RetryEvent>>,
}

impl EventConsumer {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// The fixed buffer capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the buffered events, most-recent-last.
    pub fn events(&self) -> Vec<RetryEvent> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the buffer holds no events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, event: RetryEvent) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(event);
    }
}

impl fmt::Debug for EventConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventConsumer")
            .field("capacity", &self.capacity)
            .field("buffered", &self.len())
            .finish()
    }
}

/// Per-name event sink: bounded buffers of recent events plus live
/// listener lists.
///
/// A pure fan-out - nothing here feeds back into retry decisions. Buffers
/// are created lazily on first publication (or first
/// [`consumer`](Self::consumer) call), so a consumer handle obtained after
/// events were already published still reads that history. Live listeners, by contrast,
/// see only events published after they subscribed.
pub struct EventConsumerRegistry {
    default_capacity: usize,
    consumers: RwLock<HashMap<Arc<str>, Arc<EventConsumer>>>,
    listeners: RwLock<HashMap<Arc<str>, Arc<Vec<Listener>>>>,
}

impl EventConsumerRegistry {
    /// Registry whose buffers default to [`DEFAULT_BUFFER_CAPACITY`].
    pub fn new() -> Self {
        Self::with_default_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    /// Registry whose buffers default to `capacity` events per name.
    pub fn with_default_capacity(capacity: usize) -> Self {
        Self {
            default_capacity: capacity.max(1),
            consumers: RwLock::new(HashMap::new()),
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// The buffered consumer for `name`, created at the default capacity if
    /// absent.
    pub fn consumer(&self, name: &str) -> Arc<EventConsumer> {
        self.consumer_with_capacity(name, self.default_capacity)
    }

    /// The buffered consumer for `name`, created at `capacity` if absent.
    ///
    /// Capacity is fixed at creation: if a consumer for `name` already
    /// exists, the existing one is returned and `capacity` has no effect.
    pub fn consumer_with_capacity(&self, name: &str, capacity: usize) -> Arc<EventConsumer> {
        if let Some(consumer) = self
            .consumers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return consumer.clone();
        }
        let mut consumers = self
            .consumers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        consumers
            .entry(Arc::from(name))
            .or_insert_with(|| Arc::new(EventConsumer::new(capacity.max(1))))
            .clone()
    }

    /// Subscribe a callback to every subsequent event published for `name`.
    ///
    /// Callbacks run synchronously, in emission order. Buffered history is
    /// not replayed; read it through [`consumer`](Self::consumer) or
    /// [`recent_events`](Self::recent_events).
    pub fn subscribe<F>(&self, name: &str, callback: F)
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = listeners
            .entry(Arc::from(name))
            .or_insert_with(|| Arc::new(Vec::new()));
        let mut next = Vec::with_capacity(slot.len() + 1);
        next.extend(slot.iter().cloned());
        next.push(Arc::new(callback) as Listener);
        *slot = Arc::new(next);
    }

    /// The buffered events for `name`, most-recent-last.
    ///
    /// Empty if nothing was published for that name yet.
    pub fn recent_events(&self, name: &str) -> Vec<RetryEvent> {
        self.consumers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|consumer| consumer.events())
            .unwrap_or_default()
    }

    /// Record an event into the buffer for its name and fan it out to that
    /// name's listeners.
    pub fn publish(&self, event: &RetryEvent) {
        self.consumer(&event.name).record(event.clone());

        let snapshot = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event.name.as_ref())
            .cloned();
        if let Some(listeners) = snapshot {
            for listener in listeners.iter() {
                listener(event);
            }
        }
    }
}

impl Default for EventConsumerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventConsumerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let consumers = self
            .consumers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EventConsumerRegistry")
            .field("default_capacity", &self.default_capacity)
            .field("names", &consumers.len())
            .finish()
    }
}
