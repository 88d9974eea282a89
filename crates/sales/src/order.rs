use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use salesboard_core::{
    CustomerId, DomainError, DomainResult, Entity, Money, OrderId, ProductId, UserId, WarehouseId,
};

/// One requested line as it arrives from a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub sale_price: Money,
    pub warehouse_id: WarehouseId,
}

/// A client's order request.
///
/// Clients may send a `totalPrice`; it is not part of this type and is
/// dropped during deserialization. The committed total is always computed
/// from the lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    pub customer_id: CustomerId,
    pub user_id: UserId,
    /// RFC3339 timestamp. Absent means "now".
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub product_items: Vec<OrderLineRequest>,
}

impl OrderRequest {
    /// Validate all input constraints and normalize the request.
    ///
    /// Nothing here touches stock: availability is checked by the engine under
    /// row locks.
    pub fn into_draft(self, now: DateTime<Utc>) -> DomainResult<OrderDraft> {
        self.customer_id.ensure_valid("customerId")?;
        self.user_id.ensure_valid("userId")?;
        if let Some(id) = self.order_id {
            id.ensure_valid("orderId")?;
        }
        if self.product_items.is_empty() {
            return Err(DomainError::invalid_argument(
                "order must contain at least one product item",
            ));
        }

        let created_at = match self.created_at.as_deref().map(str::trim) {
            None | Some("") => now,
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    DomainError::invalid_argument(format!("createdAt is not RFC3339: {e}"))
                })?,
        };

        let lines = self
            .product_items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| OrderLine::from_request(idx, item))
            .collect::<DomainResult<Vec<_>>>()?;
        let total_price = compute_total(&lines)?;

        Ok(OrderDraft {
            order_id: self.order_id,
            customer_id: self.customer_id,
            user_id: self.user_id,
            created_at,
            lines,
            total_price,
        })
    }
}

/// A validated order that has not been committed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub order_id: Option<OrderId>,
    pub customer_id: CustomerId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
    /// Server-computed; any client-supplied total never reaches this type.
    pub total_price: Money,
}

/// A committed order line. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
    pub sale_price: Money,
}

impl OrderLine {
    fn from_request(idx: usize, item: OrderLineRequest) -> DomainResult<Self> {
        let at = |field: &str| format!("productItems[{idx}].{field}");
        item.product_id.ensure_valid(&at("productId"))?;
        item.warehouse_id.ensure_valid(&at("warehouseId"))?;
        if item.quantity <= 0 {
            return Err(DomainError::invalid_argument(format!(
                "{} must be > 0 (got {})",
                at("quantity"),
                item.quantity
            )));
        }
        if item.sale_price.is_negative() {
            return Err(DomainError::invalid_argument(format!(
                "{} cannot be negative",
                at("salePrice")
            )));
        }
        Ok(Self {
            product_id: item.product_id,
            warehouse_id: item.warehouse_id,
            quantity: item.quantity,
            sale_price: item.sale_price,
        })
    }

    /// `quantity * sale_price`, failing on overflow.
    pub fn line_total(&self) -> DomainResult<Money> {
        self.sale_price
            .checked_times(self.quantity)
            .ok_or_else(|| DomainError::invalid_argument("line total overflows"))
    }
}

/// Sum of line totals.
pub fn compute_total(lines: &[OrderLine]) -> DomainResult<Money> {
    lines.iter().try_fold(Money::ZERO, |acc, line| {
        acc.checked_add(line.line_total()?)
            .ok_or_else(|| DomainError::invalid_argument("order total overflows"))
    })
}

/// Order header as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub total_price: Money,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> OrderId {
        self.id
    }
}

/// An order line joined with the name of its source warehouse.
///
/// `warehouse_name` is empty when the warehouse no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineDetail {
    #[serde(flatten)]
    pub line: OrderLine,
    pub warehouse_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLineDetail>,
}

/// What the caller gets back from a committed order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub total_price: Money,
}
