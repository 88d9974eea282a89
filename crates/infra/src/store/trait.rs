use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use salesboard_catalog::{Customer, NewCustomer, NewProduct, NewWarehouse, Product, Warehouse};
use salesboard_core::{
    CustomerId, DomainError, Money, OrderId, ProductId, UserId, WarehouseId,
};
use salesboard_inventory::{InventoryRecord, WarehouseInventoryLine, WarehouseStock};
use salesboard_sales::{Order, OrderLine, OrderLineDetail};

/// Storage operation error.
///
/// These are **infrastructure errors**. Services translate the constraint
/// variants into domain errors where they know the context (e.g. which ledger
/// row tripped a check constraint); everything else converts via `From`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("check constraint violated: {0}")]
    CheckViolation(String),

    #[error("foreign key violated: {0}")]
    ForeignKeyViolation(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(msg) => DomainError::conflict(msg),
            StoreError::CheckViolation(msg) | StoreError::ForeignKeyViolation(msg) => {
                DomainError::invalid_argument(msg)
            }
            StoreError::Backend(msg) => DomainError::internal(msg),
        }
    }
}

/// Header of an order about to be written. `id` is `None` when the store
/// should assign one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderShell {
    pub id: Option<OrderId>,
    pub customer_id: CustomerId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Durable storage for the catalog, the inventory ledger and orders.
///
/// Reads on `Store` see committed state only. All ledger and order mutations
/// go through a `StoreTx` obtained from `begin`.
///
/// Implementations must:
/// - serialize transactions that touch the same ledger row (row locks or
///   whole-store serialization)
/// - make every `StoreTx` all-or-nothing: nothing is visible until `commit`,
///   and dropping an uncommitted transaction rolls it back
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
    /// Replace a product's fields. `None` when it does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        product: NewProduct,
    ) -> Result<Option<Product>, StoreError>;

    async fn insert_warehouse(&self, warehouse: NewWarehouse) -> Result<Warehouse, StoreError>;
    async fn get_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError>;
    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, StoreError>;
    async fn update_warehouse(
        &self,
        id: WarehouseId,
        warehouse: NewWarehouse,
    ) -> Result<Option<Warehouse>, StoreError>;

    /// Fails with `UniqueViolation` when the email is taken.
    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError>;
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;
    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError>;
    /// Fails with `UniqueViolation` when another customer holds the email.
    async fn update_customer(
        &self,
        id: CustomerId,
        customer: NewCustomer,
    ) -> Result<Option<Customer>, StoreError>;
    /// `false` when there was nothing to delete. Orders keep their `customer_id`.
    async fn delete_customer(&self, id: CustomerId) -> Result<bool, StoreError>;

    /// Committed quantity, `None` when no row exists.
    async fn ledger_qty(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<Option<i64>, StoreError>;

    /// Every ledger row, ordered by `(warehouse_id, product_id)`.
    async fn ledger_rows(&self) -> Result<Vec<InventoryRecord>, StoreError>;

    /// Sum of `qty` for a product across all warehouses; 0 without rows.
    async fn product_total(&self, product_id: ProductId) -> Result<i64, StoreError>;

    /// Distinct products with `qty > 0` in one warehouse.
    async fn products_count(&self, warehouse_id: WarehouseId) -> Result<i64, StoreError>;

    /// `products_count` for every warehouse that holds stock. Warehouses
    /// without stocked rows are absent.
    async fn products_counts(&self) -> Result<BTreeMap<WarehouseId, i64>, StoreError>;

    /// Rows of one warehouse joined with product names, ordered by product id.
    async fn warehouse_inventory(
        &self,
        warehouse_id: WarehouseId,
    ) -> Result<Vec<WarehouseInventoryLine>, StoreError>;

    /// Rows of one product joined with warehouse names.
    async fn product_inventory(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<WarehouseStock>, StoreError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// All order headers ordered by id.
    async fn list_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// Lines of an order in insertion order, with warehouse names.
    async fn order_lines(&self, id: OrderId) -> Result<Vec<OrderLineDetail>, StoreError>;
}

/// One open store transaction.
#[async_trait]
pub trait StoreTx: Send {
    async fn warehouse_exists(&mut self, id: WarehouseId) -> Result<bool, StoreError>;

    async fn product_exists(&mut self, id: ProductId) -> Result<bool, StoreError>;

    /// Read a ledger row and hold it locked until the transaction ends.
    async fn lock_ledger_row(
        &mut self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<Option<i64>, StoreError>;

    /// `qty += delta`, creating the row when absent. Returns the new quantity.
    ///
    /// A result below zero fails with `CheckViolation`.
    async fn add_to_ledger_row(
        &mut self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<i64, StoreError>;

    /// Absolute upsert.
    async fn put_ledger_row(
        &mut self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        qty: i64,
    ) -> Result<(), StoreError>;

    /// Insert an order header with a zero total. A taken id fails with
    /// `UniqueViolation`.
    async fn insert_order(&mut self, shell: &OrderShell) -> Result<OrderId, StoreError>;

    async fn insert_order_line(&mut self, order_id: OrderId, line: &OrderLine)
        -> Result<(), StoreError>;

    async fn set_order_total(&mut self, order_id: OrderId, total: Money) -> Result<(), StoreError>;

    /// Lock an order for deletion and return its lines, or `None` if it does
    /// not exist.
    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Vec<OrderLine>>, StoreError>;

    /// Remove an order and its lines.
    async fn delete_order(&mut self, order_id: OrderId) -> Result<(), StoreError>;

    /// Remove a warehouse and every ledger row it holds. Order lines keep the
    /// warehouse id. `false` when it did not exist.
    async fn delete_warehouse(&mut self, id: WarehouseId) -> Result<bool, StoreError>;

    /// Remove a product and its empty ledger rows. A row with `qty > 0` fails
    /// with `ForeignKeyViolation`. `false` when it did not exist.
    async fn delete_product(&mut self, id: ProductId) -> Result<bool, StoreError>;

    /// Dropping a transaction without committing rolls it back.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
