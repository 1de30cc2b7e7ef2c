use crate::bus::{Routed, TopicFilter};
use std::fmt::{self, Debug};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// A filtered view over the bus channel.
///
/// Events whose topic does not pass the filter are skipped transparently.
/// A lagging subscription resumes from the oldest retained event and logs how
/// many events it missed.
pub struct Subscription<E: Routed> {
    receiver: broadcast::Receiver<Arc<E>>,
    filter: TopicFilter<E::Topic>,
}

impl<E: Routed> Debug for Subscription<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("filter", &self.filter).finish_non_exhaustive()
    }
}

impl<E: Routed> Subscription<E> {
    pub(crate) const fn new(
        receiver: broadcast::Receiver<Arc<E>>,
        filter: TopicFilter<E::Topic>,
    ) -> Self {
        Self { receiver, filter }
    }

    /// The filter this subscription was created with.
    #[must_use]
    pub const fn filter(&self) -> &TopicFilter<E::Topic> {
        &self.filter
    }

    /// Receive the next matching event, returning `None` when the bus is closed.
    pub async fn recv(&mut self) -> Option<Arc<E>> {
        let mut skipped = 0u64;

        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if !self.filter.matches(&event.topic()) {
                        continue;
                    }
                    if skipped > 0 {
                        warn!(
                            event = std::any::type_name::<E>(),
                            skipped, "Subscription lagged; continuing from latest message"
                        );
                    }
                    return Some(event);
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    skipped = skipped.saturating_add(n);
                    debug!(
                        event = std::any::type_name::<E>(),
                        skipped = n,
                        total_skipped = skipped,
                        "Subscription lagged; accumulating skipped events"
                    );
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Takes the next matching event that is already queued, without waiting.
    ///
    /// Returns `None` when nothing matching is queued or the bus is closed.
    pub fn try_recv(&mut self) -> Option<Arc<E>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event.topic()) => return Some(event),
                Ok(_) => {},
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(event = std::any::type_name::<E>(), skipped = n, "Subscription lagged");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }

    /// Drains every matching event that is already queued.
    pub fn drain(&mut self) -> Vec<Arc<E>> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
