use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salesboard_core::{ProductId, WarehouseId};
use salesboard_events::Event;

/// A warehouse's inventory was set. `count` is the number of items written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryUpdated {
    pub warehouse_id: WarehouseId,
    pub count: i64,
    #[serde(skip)]
    pub occurred_at: DateTime<Utc>,
}

impl Event for InventoryUpdated {
    fn event_type(&self) -> &'static str {
        "warehouse.inventory_updated"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Units moved between two warehouses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryTransferred {
    pub product_id: ProductId,
    pub from_warehouse_id: WarehouseId,
    pub to_warehouse_id: WarehouseId,
    pub qty: i64,
    #[serde(skip)]
    pub occurred_at: DateTime<Utc>,
}

impl Event for InventoryTransferred {
    fn event_type(&self) -> &'static str {
        "warehouse.inventory_transferred"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesboard_events::EventEnvelope;

    #[test]
    fn inventory_updated_payload_shape() {
        let event = InventoryUpdated {
            warehouse_id: WarehouseId::new(4),
            count: 2,
            occurred_at: Utc::now(),
        };
        let env = EventEnvelope::from_event(&event).unwrap();
        assert_eq!(env.event_type(), "warehouse.inventory_updated");
        assert_eq!(env.data(), &serde_json::json!({"warehouseId": 4, "count": 2}));
    }

    #[test]
    fn transfer_payload_shape() {
        let event = InventoryTransferred {
            product_id: ProductId::new(1),
            from_warehouse_id: WarehouseId::new(2),
            to_warehouse_id: WarehouseId::new(3),
            qty: 5,
            occurred_at: Utc::now(),
        };
        let env = EventEnvelope::from_event(&event).unwrap();
        assert_eq!(
            env.data(),
            &serde_json::json!({
                "productId": 1,
                "fromWarehouseId": 2,
                "toWarehouseId": 3,
                "qty": 5
            })
        );
    }
}
