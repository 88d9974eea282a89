use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use salesboard_core::{DomainError, DomainResult};
use salesboard_events::{publish_best_effort, EventBus};
use salesboard_inventory::{InventoryUpdated, UpsertInventory};

use crate::ledger::Ledger;
use crate::store::Store;

/// Sets absolute stock levels for a warehouse.
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
}

impl InventoryService {
    pub fn new(store: Arc<dyn Store>, bus: Arc<dyn EventBus>) -> Self {
        Self { store, bus }
    }

    /// All-or-nothing: either every item is written or none is.
    #[instrument(
        skip(self, request),
        fields(warehouse_id = %request.warehouse_id, items = request.items.len()),
        err
    )]
    pub async fn upsert_inventory(&self, request: UpsertInventory) -> DomainResult<()> {
        request.validate()?;
        let warehouse_id = request.warehouse_id;

        let mut tx = self.store.begin().await?;
        if !tx.warehouse_exists(warehouse_id).await? {
            return Err(DomainError::invalid_argument(format!(
                "warehouse {warehouse_id} does not exist"
            )));
        }
        for item in &request.items {
            if !tx.product_exists(item.product_id).await? {
                return Err(DomainError::invalid_argument(format!(
                    "product {} does not exist",
                    item.product_id
                )));
            }
        }
        for item in &request.items {
            Ledger::set_qty(tx.as_mut(), warehouse_id, item.product_id, item.qty).await?;
        }
        tx.commit().await?;

        tracing::info!("inventory updated");
        publish_best_effort(
            self.bus.as_ref(),
            &InventoryUpdated {
                warehouse_id,
                count: request.items.len() as i64,
                occurred_at: Utc::now(),
            },
        );
        Ok(())
    }
}
