//! In-process event hub (bounded-mailbox broadcaster).
//!
//! One hub is created at startup and shared by every service that publishes.
//! Each subscriber owns a bounded mailbox. `publish` serializes the envelope
//! once and offers the same bytes to every mailbox with a non-blocking send:
//!
//! - mailbox has room: event delivered
//! - mailbox full: event dropped **for that subscriber only**
//! - mailbox closed: subscriber pruned
//!
//! The subscriber map is guarded by one mutex that is only held for the
//! duration of the (non-blocking) fan-out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::bus::{Detach, EventBus, Subscription};
use crate::envelope::EventEnvelope;

/// Pending events per subscriber before new ones are dropped.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 16;

/// A serialized event, shared by every mailbox it was delivered to.
pub type Frame = Arc<str>;

/// Identifier of a live subscriber.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl core::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Outcome of one fan-out.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    pub dropped: usize,
    pub pruned: usize,
}

#[derive(Debug, Default)]
struct Registry {
    mailboxes: Mutex<HashMap<SubscriberId, mpsc::Sender<Frame>>>,
}

impl Registry {
    // The map is always left consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<Frame>>> {
        self.mailboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Detach for Registry {
    fn detach(&self, id: SubscriberId) {
        self.lock().remove(&id);
    }
}

/// Process-wide broadcaster with best-effort, at-most-once delivery.
///
/// `publish` never blocks and never fails, regardless of how many subscribers
/// there are or how slow they drain.
#[derive(Debug)]
pub struct EventHub {
    registry: Arc<Registry>,
    capacity: usize,
}

impl EventHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAILBOX_CAPACITY)
    }

    /// Hub whose mailboxes hold `capacity` pending events (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn mailbox_capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Offer an already-serialized frame to every mailbox.
    pub fn broadcast(&self, frame: Frame) -> FanOut {
        let mut out = FanOut::default();
        let mut mailboxes = self.registry.lock();

        mailboxes.retain(|id, tx| match tx.try_send(frame.clone()) {
            Ok(()) => {
                out.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                tracing::debug!(subscriber = %id, "mailbox full; dropping event");
                out.dropped += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                out.pruned += 1;
                false
            }
        });

        out
    }

    /// Serialize once, then fan out.
    pub fn publish_envelope(&self, envelope: &EventEnvelope) -> FanOut {
        match serde_json::to_string(envelope) {
            Ok(json) => self.broadcast(Frame::from(json)),
            Err(e) => {
                tracing::warn!(
                    event_type = envelope.event_type(),
                    error = %e,
                    "dropping event: envelope serialization failed"
                );
                FanOut::default()
            }
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for EventHub {
    fn publish(&self, envelope: &EventEnvelope) {
        let out = self.publish_envelope(envelope);
        tracing::trace!(
            event_type = envelope.event_type(),
            delivered = out.delivered,
            dropped = out.dropped,
            "event published"
        );
    }

    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = SubscriberId::new();
        self.registry.lock().insert(id, tx);

        let weak = Arc::downgrade(&self.registry);
        let registry: Weak<dyn Detach> = weak;
        Subscription::new(id, rx, registry)
    }

    fn unsubscribe(&self, id: SubscriberId) {
        self.registry.detach(id);
    }
}
