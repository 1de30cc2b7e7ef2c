//! # Dispatch
//!
//! Client-side glue between the server's JSON endpoints and the code that
//! renders posts, tags, votes and pools.
//!
//! * [`Dispatcher::add_data`] turns a [`Payload`](moe_domain::payload::Payload)
//!   into typed [`Event`]s in a fixed order.
//! * [`Registry`] holds shared objects by key.
//! * [`Requester::request`] POSTs form data and republishes the JSON answer as
//!   `<path>:ready`, or shows a localized notice on failure.
//! * [`Client`] bundles all of the above behind one cloneable handle.
//!
//! ## Example
//!
//! ```rust
//! use moe_dispatch::{Dispatcher, Event, Topic};
//! use moe_domain::payload::Payload;
//! use moe_event_bus::TopicFilter;
//!
//! let dispatcher = Dispatcher::default();
//! let mut posts = dispatcher.bus().subscribe_to(TopicFilter::one(Topic::PostAdd)).unwrap();
//!
//! let payload: Payload = serde_json::from_str(r#"{"posts": [{"id": 1}], "tags": []}"#).unwrap();
//! dispatcher.add_data(payload);
//!
//! let event = posts.try_recv().unwrap();
//! assert!(matches!(&*event, Event::PostAdd(records) if records[0]["id"] == 1));
//! ```

mod client;
mod dispatcher;
mod error;
mod event;
mod notice;
mod path;
mod registry;
mod request;

pub use crate::client::Client;
pub use crate::dispatcher::Dispatcher;
pub use crate::error::DispatchError;
pub use crate::event::{Event, PoolPosts, Topic};
pub use crate::notice::{DENIED_KEY, ERROR_KEY, Notifier, TracingNotifier, Translations};
pub use crate::path::BasePath;
pub use crate::registry::Registry;
pub use crate::request::{RequestOutcome, Requester};
