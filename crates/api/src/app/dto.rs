//! Request/response bodies that have no domain counterpart.

use serde::{Deserialize, Serialize};

use salesboard_core::WarehouseId;
use salesboard_inventory::{StockLevel, UpsertInventory};

/// `PATCH /api/warehouses/:id/inventory` body. The warehouse comes from the path.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateInventoryRequest {
    pub items: Vec<StockLevel>,
}

impl UpdateInventoryRequest {
    pub fn into_upsert(self, warehouse_id: WarehouseId) -> UpsertInventory {
        UpsertInventory {
            warehouse_id,
            items: self.items,
        }
    }
}

/// Envelope for list endpoints.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}
