use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salesboard_core::{CustomerId, Money, OrderId, UserId};
use salesboard_events::Event;

/// An order was committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub user_id: UserId,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub occurred_at: DateTime<Utc>,
}

impl Event for OrderCreated {
    fn event_type(&self) -> &'static str {
        "order.created"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// An order and its lines were removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDeleted {
    pub order_id: OrderId,
    /// Whether line quantities were returned to their warehouses.
    pub restocked: bool,
    #[serde(skip)]
    pub occurred_at: DateTime<Utc>,
}

impl Event for OrderDeleted {
    fn event_type(&self) -> &'static str {
        "order.deleted"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
