use chrono::{DateTime, Utc};

/// A domain event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **ephemeral** (never persisted; lost if nobody is listening)
/// - published only **after** the transaction that produced them has committed
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "order.created").
    fn event_type(&self) -> &'static str;

    /// When the event occurred (commit time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
