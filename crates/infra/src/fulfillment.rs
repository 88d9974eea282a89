//! Order fulfillment: reserve stock for every line and persist the order in
//! one transaction, or fail the whole order with nothing committed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{field, instrument, Span};

use salesboard_core::{DomainError, DomainResult, Money, OrderId, ProductId, WarehouseId};
use salesboard_events::{publish_best_effort, EventBus};
use salesboard_sales::{
    FulfillmentStage, Order, OrderCreated, OrderDeleted, OrderDetail, OrderDraft, OrderReceipt,
    OrderRequest,
};

use crate::ledger::Ledger;
use crate::store::{OrderShell, Store, StoreError, StoreTx};

/// What deleting an order does to the stock its lines consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDeletePolicy {
    /// Remove the order; consumed stock stays consumed.
    #[default]
    Erase,
    /// Return every line's quantity to its source warehouse.
    Restock,
}

impl core::str::FromStr for OrderDeletePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "erase" => Ok(OrderDeletePolicy::Erase),
            "restock" => Ok(OrderDeletePolicy::Restock),
            other => Err(DomainError::invalid_argument(format!(
                "unknown order delete policy '{other}' (expected erase or restock)"
            ))),
        }
    }
}

/// Tracks the fulfillment stage on the current span.
struct Progress {
    stage: FulfillmentStage,
    span: Span,
}

impl Progress {
    fn start(span: Span) -> Self {
        span.record("stage", FulfillmentStage::Validating.as_str());
        Self {
            stage: FulfillmentStage::Validating,
            span,
        }
    }

    fn advance(&mut self, next: FulfillmentStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal fulfillment transition {} -> {}",
            self.stage,
            next
        );
        tracing::debug!(from = %self.stage, to = %next, "fulfillment stage");
        self.stage = next;
        self.span.record("stage", next.as_str());
    }
}

#[derive(Clone)]
pub struct OrderFulfillmentEngine {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
    delete_policy: OrderDeletePolicy,
}

impl OrderFulfillmentEngine {
    pub fn new(store: Arc<dyn Store>, bus: Arc<dyn EventBus>) -> Self {
        Self {
            store,
            bus,
            delete_policy: OrderDeletePolicy::default(),
        }
    }

    pub fn with_delete_policy(mut self, policy: OrderDeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    /// Validate, reserve and commit an order.
    ///
    /// Any client-supplied total is ignored; the committed total is the sum of
    /// `quantity * salePrice` over the lines. `order.created` is published
    /// after the commit.
    #[instrument(
        skip(self, request),
        fields(stage = field::Empty, order_id = field::Empty, total_price = field::Empty),
        err
    )]
    pub async fn create_order(&self, request: OrderRequest) -> DomainResult<OrderReceipt> {
        let mut progress = Progress::start(Span::current());

        let draft = match request.into_draft(Utc::now()) {
            Ok(draft) => draft,
            Err(e) => {
                progress.advance(FulfillmentStage::Aborted);
                return Err(e);
            }
        };

        let (order_id, total_price) = match self.reserve_and_commit(&draft, &mut progress).await {
            Ok(committed) => committed,
            Err(e) => {
                progress.advance(FulfillmentStage::Aborted);
                return Err(e);
            }
        };
        progress.advance(FulfillmentStage::Committed);

        let span = Span::current();
        span.record("order_id", order_id.get());
        span.record("total_price", total_price.minor());
        tracing::info!(
            lines = draft.lines.len(),
            customer_id = %draft.customer_id,
            "order committed"
        );

        publish_best_effort(
            self.bus.as_ref(),
            &OrderCreated {
                order_id,
                customer_id: draft.customer_id,
                user_id: draft.user_id,
                total_price,
                created_at: draft.created_at,
                occurred_at: Utc::now(),
            },
        );

        Ok(OrderReceipt {
            order_id,
            total_price,
        })
    }

    async fn reserve_and_commit(
        &self,
        draft: &OrderDraft,
        progress: &mut Progress,
    ) -> DomainResult<(OrderId, Money)> {
        let mut tx = self.store.begin().await?;
        progress.advance(FulfillmentStage::Reserving);

        let order_id = tx
            .insert_order(&OrderShell {
                id: draft.order_id,
                customer_id: draft.customer_id,
                user_id: draft.user_id,
                created_at: draft.created_at,
            })
            .await
            .map_err(|e| match (e, draft.order_id) {
                (StoreError::UniqueViolation(_), Some(id)) => {
                    DomainError::conflict(format!("order {id} already exists"))
                }
                (e, _) => e.into(),
            })?;

        // Take row locks in key order so that two orders touching the same
        // rows cannot deadlock; availability is still checked line by line.
        let keys: BTreeSet<_> = draft
            .lines
            .iter()
            .map(|l| (l.warehouse_id, l.product_id))
            .collect();
        for &(warehouse_id, product_id) in &keys {
            tx.lock_ledger_row(warehouse_id, product_id).await?;
        }

        for line in &draft.lines {
            reserve_line(tx.as_mut(), line.warehouse_id, line.product_id, line.quantity).await?;
            tx.insert_order_line(order_id, line).await?;
        }

        progress.advance(FulfillmentStage::Committing);
        tx.set_order_total(order_id, draft.total_price).await?;
        tx.commit().await?;
        Ok((order_id, draft.total_price))
    }

    /// Order header plus lines with warehouse names.
    pub async fn get_order(&self, order_id: OrderId) -> DomainResult<OrderDetail> {
        order_id.ensure_valid("orderId")?;
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;
        let lines = self.store.order_lines(order_id).await?;
        Ok(OrderDetail { order, lines })
    }

    pub async fn list_orders(&self) -> DomainResult<Vec<Order>> {
        Ok(self.store.list_orders().await?)
    }

    /// Remove an order and its lines, applying the configured delete policy.
    #[instrument(skip(self), fields(policy = ?self.delete_policy), err)]
    pub async fn delete_order(&self, order_id: OrderId) -> DomainResult<()> {
        order_id.ensure_valid("orderId")?;

        let mut tx = self.store.begin().await?;
        let lines = tx
            .lock_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;

        let restock = self.delete_policy == OrderDeletePolicy::Restock;
        if restock {
            // Same key order as reservation.
            let mut returns: BTreeMap<(WarehouseId, ProductId), i64> = BTreeMap::new();
            for line in &lines {
                *returns.entry((line.warehouse_id, line.product_id)).or_default() += line.quantity;
            }
            for ((warehouse_id, product_id), qty) in returns {
                if !tx.warehouse_exists(warehouse_id).await? || !tx.product_exists(product_id).await? {
                    // Deleted since the order was placed; nothing to return to.
                    tracing::warn!(%warehouse_id, %product_id, qty, "restock target gone, skipping");
                    continue;
                }
                Ledger::adjust_qty(tx.as_mut(), warehouse_id, product_id, qty).await?;
            }
        }
        tx.delete_order(order_id).await?;
        tx.commit().await?;

        tracing::info!(lines = lines.len(), restock, "order deleted");
        publish_best_effort(
            self.bus.as_ref(),
            &OrderDeleted {
                order_id,
                restocked: restock,
                occurred_at: Utc::now(),
            },
        );
        Ok(())
    }
}

/// Deduct `quantity` from a ledger row that must exist and hold enough.
async fn reserve_line(
    tx: &mut dyn StoreTx,
    warehouse_id: WarehouseId,
    product_id: ProductId,
    quantity: i64,
) -> DomainResult<()> {
    let available = tx
        .lock_ledger_row(warehouse_id, product_id)
        .await?
        .ok_or(DomainError::NoInventory {
            warehouse_id,
            product_id,
        })?;
    if available < quantity {
        return Err(DomainError::insufficient_stock(
            warehouse_id,
            product_id,
            quantity,
            available,
        ));
    }
    Ledger::adjust_qty(tx, warehouse_id, product_id, -quantity).await?;
    Ok(())
}
