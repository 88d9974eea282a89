//! `salesboard-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the `Money` value object and the error taxonomy shared by
//! every other crate in the workspace.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{CustomerId, OrderId, ProductId, UserId, WarehouseId};
pub use value_object::{Money, ValueObject};
