use crate::event::Event;
use moe_domain::payload::Payload;
use moe_event_bus::EventBus;
use tracing::debug;

/// Fans a server payload out onto the client bus.
///
/// Cloning is cheap; clones publish on the same bus.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    bus: EventBus<Event>,
}

impl Dispatcher {
    #[must_use]
    pub const fn new(bus: EventBus<Event>) -> Self {
        Self { bus }
    }

    /// The bus subscribers attach to.
    #[must_use]
    pub const fn bus(&self) -> &EventBus<Event> {
        &self.bus
    }

    /// Publishes one event per present payload field.
    ///
    /// Order is fixed: posts, tags, votes, voted_by, pools, pool_posts.
    /// `pool:add_post` carries the payload's posts alongside the memberships.
    /// Every listener has run by the time this returns.
    pub fn add_data(&self, payload: Payload) {
        for (field, records) in payload.present() {
            let event = Event::from_field(field, records.clone(), payload.posts.as_ref());
            self.publish(event);
        }
    }

    /// Publishes a single event and returns how many receivers it reached.
    pub fn publish(&self, event: Event) -> usize {
        let topic = moe_event_bus::Routed::topic(&event);
        let reached = self.bus.publish(event);
        debug!(%topic, reached, "Event published");
        reached
    }
}
