//! Storage boundary.
//!
//! `Store` holds the catalog, the inventory ledger and orders. Services open a
//! `StoreTx` for every mutation and never hold a global handle: the store is
//! injected at construction.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{OrderShell, Store, StoreError, StoreTx};
