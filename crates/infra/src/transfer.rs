use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use salesboard_core::{DomainError, DomainResult};
use salesboard_events::{publish_best_effort, EventBus};
use salesboard_inventory::{InventoryTransferred, TransferRequest};

use crate::ledger::Ledger;
use crate::store::Store;

/// Moves stock of one product between two warehouses.
///
/// Both ledger rows change in the same transaction, so the product's total
/// quantity across warehouses is the same before and after every transfer.
#[derive(Clone)]
pub struct TransferService {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
}

impl TransferService {
    pub fn new(store: Arc<dyn Store>, bus: Arc<dyn EventBus>) -> Self {
        Self { store, bus }
    }

    #[instrument(
        skip(self),
        fields(
            product_id = %request.product_id,
            from = %request.from_warehouse_id,
            to = %request.to_warehouse_id,
            qty = request.qty
        ),
        err
    )]
    pub async fn transfer_stock(&self, request: TransferRequest) -> DomainResult<()> {
        request.validate()?;
        let TransferRequest {
            product_id,
            from_warehouse_id: from,
            to_warehouse_id: to,
            qty,
        } = request;

        let mut tx = self.store.begin().await?;
        if !tx.warehouse_exists(to).await? {
            return Err(DomainError::invalid_argument(format!(
                "destination warehouse {to} does not exist"
            )));
        }

        // Lock both rows in warehouse order; opposite transfers then queue
        // instead of deadlocking.
        let (first, second) = if from < to { (from, to) } else { (to, from) };
        let mut source = None;
        for warehouse_id in [first, second] {
            let qty = tx.lock_ledger_row(warehouse_id, product_id).await?;
            if warehouse_id == from {
                source = qty;
            }
        }

        let available = source.unwrap_or(0);
        if available < qty {
            return Err(DomainError::insufficient_stock(from, product_id, qty, available));
        }

        Ledger::adjust_qty(tx.as_mut(), from, product_id, -qty).await?;
        Ledger::adjust_qty(tx.as_mut(), to, product_id, qty).await?;
        tx.commit().await?;

        tracing::info!("stock transferred");
        publish_best_effort(
            self.bus.as_ref(),
            &InventoryTransferred {
                product_id,
                from_warehouse_id: from,
                to_warehouse_id: to,
                qty,
                occurred_at: Utc::now(),
            },
        );
        Ok(())
    }
}
