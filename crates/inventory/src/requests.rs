use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use salesboard_core::{DomainError, DomainResult, ProductId, WarehouseId};

use crate::record::validate_absolute_qty;

/// Move `qty` units of a product from one warehouse to another.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub product_id: ProductId,
    pub from_warehouse_id: WarehouseId,
    pub to_warehouse_id: WarehouseId,
    pub qty: i64,
}

impl TransferRequest {
    pub fn validate(&self) -> DomainResult<()> {
        self.product_id.ensure_valid("productId")?;
        self.from_warehouse_id.ensure_valid("fromWarehouseId")?;
        self.to_warehouse_id.ensure_valid("toWarehouseId")?;
        if self.qty <= 0 {
            return Err(DomainError::invalid_argument(format!(
                "qty must be > 0 (got {})",
                self.qty
            )));
        }
        if self.from_warehouse_id == self.to_warehouse_id {
            return Err(DomainError::invalid_argument(
                "fromWarehouseId and toWarehouseId must differ",
            ));
        }
        Ok(())
    }
}

/// Absolute quantity for one product.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    #[serde(alias = "product_id")]
    pub product_id: ProductId,
    pub qty: i64,
}

/// Set absolute quantities for several products in one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertInventory {
    pub warehouse_id: WarehouseId,
    pub items: Vec<StockLevel>,
}

impl UpsertInventory {
    /// Checks every item before anything is written, so a bad item rejects
    /// the whole batch.
    pub fn validate(&self) -> DomainResult<()> {
        self.warehouse_id.ensure_valid("warehouseId")?;
        if self.items.is_empty() {
            return Err(DomainError::invalid_argument("items cannot be empty"));
        }
        let mut seen = HashSet::with_capacity(self.items.len());
        for item in &self.items {
            item.product_id.ensure_valid("productId")?;
            validate_absolute_qty(item.product_id, item.qty)?;
            if !seen.insert(item.product_id) {
                return Err(DomainError::invalid_argument(format!(
                    "product {} listed more than once",
                    item.product_id
                )));
            }
        }
        Ok(())
    }
}
