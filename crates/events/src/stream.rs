//! Per-subscriber delivery loop.
//!
//! A transport (e.g. an SSE handler) spawns one `pump` per connected client and
//! reads `StreamItem`s from the returned channel. The loop waits on whichever
//! comes first:
//!
//! - the next event in the subscription mailbox
//! - cancellation (the transport dropped its receiver, i.e. the client left)
//! - the heartbeat tick, which yields a keepalive without touching the mailbox

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::bus::Subscription;
use crate::hub::Frame;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Event(Frame),
    Heartbeat,
}

/// Forward events from `subscription` into `out` until the consumer goes away.
///
/// On return the subscription has been unsubscribed.
pub async fn pump(mut subscription: Subscription, heartbeat: Duration, out: mpsc::Sender<StreamItem>) {
    let period = heartbeat.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let item = tokio::select! {
            biased;
            _ = out.closed() => break,
            frame = subscription.recv() => match frame {
                Some(frame) => StreamItem::Event(frame),
                None => break,
            },
            _ = ticker.tick() => StreamItem::Heartbeat,
        };

        if out.send(item).await.is_err() {
            break;
        }
    }

    tracing::debug!(subscriber = %subscription.id(), "subscriber loop finished");
    subscription.unsubscribe();
}
