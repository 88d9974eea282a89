//! Domain events and the in-process notification hub.
//!
//! - `Event`: typed domain events emitted after a successful commit
//! - `EventEnvelope`: the stable wire shape `{type, data, time}` subscribers see
//! - `EventBus` / `Subscription`: publish/subscribe abstraction
//! - `EventHub`: bounded-mailbox broadcaster (best-effort, at-most-once)
//! - `pump`: per-subscriber loop (next event, cancellation, or heartbeat)

pub mod bus;
pub mod envelope;
pub mod event;
pub mod hub;
pub mod stream;

pub use bus::{publish_best_effort, EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use hub::{EventHub, FanOut, Frame, SubscriberId, DEFAULT_MAILBOX_CAPACITY};
pub use stream::{pump, StreamItem};
