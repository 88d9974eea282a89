use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::event::Event;

/// Envelope for an event as it travels to subscribers.
///
/// The serialized form is the contract consumers rely on:
///
/// ```json
/// {"type": "order.created", "data": {...}, "time": "2025-01-01T12:00:00Z"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: JsonValue,
    time: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn new(event_type: impl Into<String>, data: JsonValue, time: DateTime<Utc>) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            time,
        }
    }

    /// Wrap a typed domain event; the event body becomes `data`.
    pub fn from_event<E>(event: &E) -> Result<Self, serde_json::Error>
    where
        E: Event + Serialize,
    {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: serde_json::to_value(event)?,
            time: event.occurred_at(),
        })
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn data(&self) -> &JsonValue {
        &self.data
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Pinged {
        order_id: i64,
        #[serde(skip)]
        at: DateTime<Utc>,
    }

    impl Event for Pinged {
        fn event_type(&self) -> &'static str {
            "test.pinged"
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }
    }

    #[test]
    fn wire_shape_is_type_data_time() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        let env = EventEnvelope::from_event(&Pinged { order_id: 7, at }).unwrap();

        let wire = serde_json::to_value(&env).unwrap();
        assert_eq!(
            wire,
            json!({
                "type": "test.pinged",
                "data": {"orderId": 7},
                "time": "2025-03-01T09:30:00Z",
            })
        );
    }
}
