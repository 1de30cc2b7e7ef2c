use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::event::Event;
use crate::notice::Notifier;
use crate::registry::Registry;
use crate::request::{RequestOutcome, Requester};
use moe_domain::config::ClientSettings;
use moe_domain::payload::Payload;
use moe_event_bus::EventBus;
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;

/// One handle over the bus, the registry and the requester.
///
/// Build it once at startup and pass clones around; every clone shares the
/// same bus and registry for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Client {
    dispatcher: Dispatcher,
    registry: Registry,
    requester: Requester,
}

impl Client {
    /// # Errors
    /// See [`Requester::new`].
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, DispatchError> {
        let dispatcher = Dispatcher::new(EventBus::new());
        let requester = Requester::new(dispatcher.clone(), settings)?;
        Ok(Self { dispatcher, registry: Registry::new(), requester })
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.requester = self.requester.with_notifier(notifier);
        self
    }

    #[must_use]
    pub const fn bus(&self) -> &EventBus<Event> {
        self.dispatcher.bus()
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn add_data(&self, payload: Payload) {
        self.dispatcher.add_data(payload);
    }

    pub fn attach<T: Any + Send + Sync>(&self, key: impl Into<String>, value: T) -> bool {
        self.registry.attach(key, value)
    }

    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.registry.get(key)
    }

    pub async fn request<P: Serialize + ?Sized>(&self, path: &str, params: &P) -> RequestOutcome {
        self.requester.request(path, params).await
    }

    #[must_use]
    pub fn path(&self, path: &str) -> String {
        self.requester.base_path().resolve(path)
    }
}
