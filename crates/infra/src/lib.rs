//! Infrastructure layer: storage, the transactional services built on it, and
//! configuration.
//!
//! Control flow for every mutation:
//!
//! transport -> service -> `Ledger` (read-check-write inside a `StoreTx`)
//! -> commit -> publish to the `EventBus`

pub mod catalog;
pub mod config;
pub mod fulfillment;
pub mod inventory_service;
pub mod ledger;
pub mod store;
pub mod transfer;

mod integration_tests;

pub use catalog::CatalogService;
pub use config::AppConfig;
pub use fulfillment::{OrderDeletePolicy, OrderFulfillmentEngine};
pub use inventory_service::InventoryService;
pub use ledger::Ledger;
pub use store::{InMemoryStore, PostgresStore, Store, StoreError, StoreTx};
pub use transfer::TransferService;
