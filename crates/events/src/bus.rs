//! Event publishing/subscription abstraction.
//!
//! ## Delivery contract
//!
//! - **At-most-once**: a subscriber sees each event zero or one times
//! - **No replay**: events published while nobody is subscribed are gone
//! - **No backpressure**: a slow subscriber loses events; the publisher never waits
//!
//! Guaranteed delivery would require persistence and replay, which this bus does
//! not attempt. Consumers that need completeness must re-read state from the
//! store after (re)connecting.

use std::sync::Weak;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::envelope::EventEnvelope;
use crate::event::Event;
use crate::hub::{Frame, SubscriberId};

/// Something a subscription can detach itself from when it is dropped.
pub(crate) trait Detach: Send + Sync {
    fn detach(&self, id: SubscriberId);
}

/// A live subscription: a bounded mailbox of serialized events.
///
/// Dropping the subscription unsubscribes it. `unsubscribe` may also be called
/// explicitly; both paths are idempotent.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Frame>,
    registry: Weak<dyn Detach>,
}

impl core::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriberId,
        receiver: mpsc::Receiver<Frame>,
        registry: Weak<dyn Detach>,
    ) -> Self {
        Self {
            id,
            receiver,
            registry,
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event. Returns `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    /// Take the next pending event without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }

    /// Remove this subscriber from the bus. Pending events remain readable.
    pub fn unsubscribe(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.detach(self.id);
        }
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.detach(self.id);
        }
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// `publish` is infallible by contract: it must not block and must not surface
/// delivery problems to the caller. Services publish after their transaction has
/// committed and nothing a subscriber does can undo that commit.
pub trait EventBus: Send + Sync {
    fn publish(&self, envelope: &EventEnvelope);

    fn subscribe(&self) -> Subscription;

    fn unsubscribe(&self, id: SubscriberId);
}

/// Wrap a typed event and publish it, logging (never returning) failures.
pub fn publish_best_effort<E>(bus: &dyn EventBus, event: &E)
where
    E: Event + Serialize,
{
    match EventEnvelope::from_event(event) {
        Ok(envelope) => bus.publish(&envelope),
        Err(e) => tracing::warn!(
            event_type = event.event_type(),
            error = %e,
            "dropping event: payload serialization failed"
        ),
    }
}
