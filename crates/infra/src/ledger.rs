//! Inventory ledger: the only authority on stock quantities.
//!
//! Mutations take the caller's `StoreTx` so that several adjustments (all lines
//! of an order, both sides of a transfer) commit or roll back together. Reads
//! go to committed state. Aggregates are computed by the store at read time
//! (`SUM`/`COUNT` in Postgres) and are never stored.

use std::sync::Arc;

use tracing::instrument;

use salesboard_core::{DomainError, DomainResult, ProductId, WarehouseId};
use salesboard_inventory::{
    adjusted_qty, validate_absolute_qty, ProductStock, WarehouseInventoryLine,
    WarehouseSummary,
};

use crate::store::{Store, StoreError, StoreTx};

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Committed quantity; a missing row reads as 0.
    pub async fn get_qty(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> DomainResult<i64> {
        Ok(self
            .store
            .ledger_qty(warehouse_id, product_id)
            .await?
            .unwrap_or(0))
    }

    /// `qty += delta` inside `tx`. Returns the new quantity.
    ///
    /// Fails with `InsufficientStock` when the result would be negative.
    /// `delta == 0` reads the row and changes nothing.
    #[instrument(skip(tx))]
    pub async fn adjust_qty(
        tx: &mut dyn StoreTx,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        delta: i64,
    ) -> DomainResult<i64> {
        let current = tx.lock_ledger_row(warehouse_id, product_id).await?.unwrap_or(0);
        let next = adjusted_qty(warehouse_id, product_id, current, delta)?;
        if delta == 0 {
            return Ok(current);
        }
        tx.add_to_ledger_row(warehouse_id, product_id, delta)
            .await
            .map_err(|e| match e {
                StoreError::CheckViolation(_) => DomainError::insufficient_stock(
                    warehouse_id,
                    product_id,
                    delta.saturating_neg(),
                    current,
                ),
                other => other.into(),
            })?;
        Ok(next)
    }

    /// Absolute upsert inside `tx`.
    #[instrument(skip(tx))]
    pub async fn set_qty(
        tx: &mut dyn StoreTx,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        qty: i64,
    ) -> DomainResult<()> {
        let qty = validate_absolute_qty(product_id, qty)?;
        tx.put_ledger_row(warehouse_id, product_id, qty).await?;
        Ok(())
    }

    /// Sum of `qty` for a product across all warehouses.
    pub async fn total_stock_for(&self, product_id: ProductId) -> DomainResult<i64> {
        Ok(self.store.product_total(product_id).await?)
    }

    /// Distinct products with `qty > 0` held by a warehouse.
    pub async fn products_count_for(&self, warehouse_id: WarehouseId) -> DomainResult<i64> {
        Ok(self.store.products_count(warehouse_id).await?)
    }

    pub async fn warehouse_summary(&self, warehouse_id: WarehouseId) -> DomainResult<WarehouseSummary> {
        let warehouse = self
            .store
            .get_warehouse(warehouse_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("warehouse {warehouse_id}")))?;
        let products_count = self.store.products_count(warehouse_id).await?;
        Ok(WarehouseSummary::new(warehouse, products_count))
    }

    pub async fn warehouse_summaries(&self) -> DomainResult<Vec<WarehouseSummary>> {
        let warehouses = self.store.list_warehouses().await?;
        let counts = self.store.products_counts().await?;
        Ok(warehouses
            .into_iter()
            .map(|w| {
                let products_count = counts.get(&w.id).copied().unwrap_or(0);
                WarehouseSummary::new(w, products_count)
            })
            .collect())
    }

    /// Product lines held by a warehouse, ordered by product id.
    pub async fn inventory_for_warehouse(
        &self,
        warehouse_id: WarehouseId,
    ) -> DomainResult<Vec<WarehouseInventoryLine>> {
        if self.store.get_warehouse(warehouse_id).await?.is_none() {
            return Err(DomainError::not_found(format!("warehouse {warehouse_id}")));
        }
        Ok(self.store.warehouse_inventory(warehouse_id).await?)
    }

    /// Where a product is held, plus its total.
    pub async fn inventory_for_product(&self, product_id: ProductId) -> DomainResult<ProductStock> {
        if self.store.get_product(product_id).await?.is_none() {
            return Err(DomainError::not_found(format!("product {product_id}")));
        }
        let rows = self.store.product_inventory(product_id).await?;
        Ok(ProductStock::new(product_id, rows))
    }
}
