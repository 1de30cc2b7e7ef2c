use crate::error::EventBusError;
use crate::receiver::Subscription;
use parking_lot::RwLock;
use std::fmt::{self, Debug};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;

/// A safe default for channel buffers.
/// 128 is usually enough for a burst of events produced by one payload.
const DEFAULT_CAPACITY: usize = 128;
const MIN_CAPACITY: usize = 1;

/// An event that knows which topic it belongs to.
///
/// The bus never inspects payloads; routing is done on [`Routed::topic`] alone.
pub trait Routed: Send + Sync + 'static {
    /// The closed set of topics this event type can be published under.
    type Topic: Clone + PartialEq + Debug + Send + Sync + 'static;

    /// Returns the topic this event is published under.
    fn topic(&self) -> Self::Topic;
}

/// Selects which topics a subscriber or listener observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicFilter<T> {
    /// Every topic.
    All,
    /// Only the listed topics.
    Only(Vec<T>),
}

impl<T: PartialEq> TopicFilter<T> {
    /// Filter for a single topic.
    #[must_use]
    pub fn one(topic: T) -> Self {
        Self::Only(vec![topic])
    }

    /// Returns `true` if `topic` passes the filter.
    #[must_use]
    pub fn matches(&self, topic: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(topics) => topics.contains(topic),
        }
    }
}

/// Opaque handle returned by [`EventBus::listen`], used to detach the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listener<E: Routed> {
    id: ListenerId,
    filter: TopicFilter<E::Topic>,
    handler: Handler<E>,
}

impl<E: Routed> Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).field("filter", &self.filter).finish()
    }
}

struct Inner<E: Routed> {
    sender: RwLock<Option<broadcast::Sender<Arc<E>>>>,
    listeners: RwLock<Vec<Listener<E>>>,
    next_listener: AtomicU64,
    capacity: usize,
}

/// A thread-safe, ordered event bus.
///
/// All events travel through one broadcast channel, so a subscriber that
/// observes several topics sees them in exactly the order they were published.
/// Synchronous listeners registered with [`EventBus::listen`] run inline inside
/// [`EventBus::publish`], before it returns.
pub struct EventBus<E: Routed> {
    inner: Arc<Inner<E>>,
}

impl<E: Routed> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<E: Routed> Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.inner.capacity)
            .field("open", &self.inner.sender.read().is_some())
            .field("listeners", &self.inner.listeners.read().len())
            .finish()
    }
}

impl<E: Routed> Default for EventBus<E> {
    fn default() -> Self {
        Self::build(DEFAULT_CAPACITY)
    }
}

impl<E: Routed> EventBus<E> {
    /// Creates a new bus with the default buffer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new bus with a specific broadcast buffer capacity.
    ///
    /// # Errors
    /// Returns [`EventBusError::InvalidCapacity`] if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Result<Self, EventBusError> {
        if capacity < MIN_CAPACITY {
            return Err(EventBusError::InvalidCapacity {
                message: format!("capacity must be >= {MIN_CAPACITY}").into(),
                context: None,
            });
        }
        Ok(Self::build(capacity))
    }

    fn build(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(Inner {
                sender: RwLock::new(Some(tx)),
                listeners: RwLock::new(Vec::new()),
                next_listener: AtomicU64::new(0),
                capacity,
            }),
        }
    }

    /// Subscribes to every topic.
    ///
    /// # Errors
    /// Returns [`EventBusError::Closed`] after [`EventBus::shutdown`].
    pub fn subscribe(&self) -> Result<Subscription<E>, EventBusError> {
        self.subscribe_to(TopicFilter::All)
    }

    /// Subscribes to the topics selected by `filter`.
    ///
    /// # Errors
    /// Returns [`EventBusError::Closed`] after [`EventBus::shutdown`].
    pub fn subscribe_to(
        &self,
        filter: TopicFilter<E::Topic>,
    ) -> Result<Subscription<E>, EventBusError> {
        let sender = self.inner.sender.read();
        let tx = sender.as_ref().ok_or_else(|| EventBusError::Closed {
            message: "cannot subscribe to a closed bus".into(),
            context: Some(std::any::type_name::<E>().into()),
        })?;
        trace!(event = std::any::type_name::<E>(), ?filter, "New subscription");
        Ok(Subscription::new(tx.subscribe(), filter))
    }

    /// Registers a synchronous listener invoked inline by [`EventBus::publish`]
    /// for every event that passes `filter`.
    pub fn listen<F>(&self, filter: TopicFilter<E::Topic>, handler: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push(Listener { id, filter, handler: Arc::new(handler) });
        id
    }

    /// Detaches a listener. Returns `false` if it was already gone.
    pub fn unlisten(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Publishes an event to every listener and subscriber.
    ///
    /// Returns how many listeners and channel receivers the event reached.
    /// Publishing with nobody listening is not an error.
    pub fn publish(&self, event: E) -> usize {
        self.publish_arc(Arc::new(event))
    }

    /// Publishes a shared event instance without re-wrapping.
    pub fn publish_arc(&self, event: Arc<E>) -> usize {
        let topic = event.topic();

        // Cloned out of the lock so handlers may publish or listen re-entrantly.
        let handlers: Vec<Handler<E>> = self
            .inner
            .listeners
            .read()
            .iter()
            .filter(|l| l.filter.matches(&topic))
            .map(|l| Arc::clone(&l.handler))
            .collect();
        for handler in &handlers {
            handler(&event);
        }

        let sender = self.inner.sender.read().clone();
        let delivered = sender.map_or(0, |tx| tx.send(event).unwrap_or(0));

        let count = handlers.len() + delivered;
        if count == 0 {
            trace!(?topic, "Event dropped: no active subscribers");
        } else {
            trace!(?topic, count, "Event dispatched");
        }
        count
    }

    /// Number of live channel subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.sender.read().as_ref().map_or(0, broadcast::Sender::receiver_count)
    }

    /// Gracefully shuts down the bus by closing the channel and dropping listeners.
    ///
    /// Pending events stay readable by existing subscriptions, after which they
    /// observe closure. Returns the number of listeners that were dropped.
    #[must_use]
    pub fn shutdown(&self) -> usize {
        self.inner.sender.write().take();
        let mut listeners = self.inner.listeners.write();
        let count = listeners.len();
        listeners.clear();
        count
    }
}
