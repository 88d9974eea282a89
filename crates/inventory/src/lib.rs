//! Inventory ledger rules.
//!
//! This crate contains the business rules for per-(warehouse, product) stock,
//! implemented purely as deterministic domain logic (no IO, no storage). The
//! transactional ledger in `salesboard-infra` applies these rules to rows it
//! has locked.

pub mod aggregates;
pub mod events;
pub mod record;
pub mod requests;

pub use aggregates::{
    products_count, total_stock, ProductStock, WarehouseInventoryLine, WarehouseStock,
    WarehouseSummary,
};
pub use events::{InventoryTransferred, InventoryUpdated};
pub use record::{adjusted_qty, validate_absolute_qty, InventoryRecord};
pub use requests::{StockLevel, TransferRequest, UpsertInventory};
