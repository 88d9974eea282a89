//! Live event stream over Server-Sent Events.
//!
//! Each connection gets its own hub subscription and delivery task. Events go
//! out as `event: message` with the JSON envelope as data; idle periods are
//! filled with `: ping` comments so proxies keep the connection open.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::Extension,
    response::{
        sse::{Event as SseEvent, Sse},
        IntoResponse,
    },
    routing::get,
    Router,
};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};

use salesboard_events::{pump, EventBus, StreamItem};

use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/events", get(stream_events))
}

/// GET /api/events
pub async fn stream_events(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let subscription = services.hub.subscribe();
    tracing::debug!(subscriber = %subscription.id(), "event stream opened");

    // Backpressure lives in the hub mailbox; this channel only hands items to the writer.
    let (tx, rx) = mpsc::channel::<StreamItem>(1);
    tokio::spawn(pump(subscription, services.sse_heartbeat, tx));

    let stream = ReceiverStream::new(rx).map(|item| Ok::<_, Infallible>(to_sse(item)));
    Sse::new(stream).into_response()
}

fn to_sse(item: StreamItem) -> SseEvent {
    match item {
        StreamItem::Event(frame) => SseEvent::default().event("message").data(frame),
        StreamItem::Heartbeat => SseEvent::default().comment("ping"),
    }
}

