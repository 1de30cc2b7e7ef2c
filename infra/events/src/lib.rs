//! # Event Bus
//!
//! A type-safe, ordered event bus for connecting decoupled components.
//!
//! ## Overview
//!
//! Events are a closed type implementing [`Routed`]; each value reports the
//! topic it belongs to. Consumers either subscribe to a filtered channel view
//! ([`Subscription`]) or register synchronous listeners that run inline during
//! [`EventBus::publish`].
//!
//! ## Features
//!
//! * **Type-Safe**: One bus per event enum, topics are a closed Rust type.
//! * **Ordered**: A single broadcast channel keeps publication order across topics.
//! * **Synchronous delivery**: Listeners observe the event before `publish` returns.
//! * **Async Ready**: Subscriptions are built on top of `tokio::sync::broadcast`.
//!
//! # Example
//!
//! ```rust
//! use moe_event_bus::{EventBus, EventBusError, Routed, TopicFilter};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum Signal { Ping(u64), Pong(u64) }
//!
//! #[derive(Clone, Debug, PartialEq)]
//! enum SignalTopic { Ping, Pong }
//!
//! impl Routed for Signal {
//!     type Topic = SignalTopic;
//!     fn topic(&self) -> SignalTopic {
//!         match self {
//!             Self::Ping(_) => SignalTopic::Ping,
//!             Self::Pong(_) => SignalTopic::Pong,
//!         }
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::<Signal>::new();
//!     let mut pings = bus.subscribe_to(TopicFilter::one(SignalTopic::Ping))?;
//!
//!     bus.publish(Signal::Pong(1));
//!     bus.publish(Signal::Ping(2));
//!
//!     assert_eq!(*pings.recv().await.unwrap(), Signal::Ping(2));
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod receiver;

pub use bus::{EventBus, ListenerId, Routed, TopicFilter};
pub use error::EventBusError;
pub use receiver::Subscription;
