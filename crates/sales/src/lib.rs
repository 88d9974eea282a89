//! Sales orders domain module.
//!
//! This crate contains business rules for orders, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Reserving stock
//! and persisting orders is the fulfillment engine's job in `salesboard-infra`.

pub mod events;
pub mod order;
pub mod stage;

pub use events::{OrderCreated, OrderDeleted};
pub use order::{
    compute_total, Order, OrderDetail, OrderDraft, OrderLine, OrderLineDetail, OrderLineRequest,
    OrderReceipt, OrderRequest,
};
pub use stage::FulfillmentStage;
