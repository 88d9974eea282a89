//! Catalog Store records: products, warehouses and customers.
//!
//! These are plain keyed records with create-time validation. The inventory
//! ledger and order engine reference them by id but never mutate them.

pub mod customer;
pub mod product;
pub mod warehouse;

pub use customer::{Customer, NewCustomer};
pub use product::{NewProduct, Product};
pub use warehouse::{NewWarehouse, Warehouse};
