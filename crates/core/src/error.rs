//! Domain error model.

use thiserror::Error;

use crate::id::{ProductId, WarehouseId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every operation the core exposes fails with one of these kinds so callers
/// can tell "insufficient stock for product X in warehouse Y" apart from a
/// server failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input, detected before any mutation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No ledger row exists for the requested (warehouse, product) pair.
    #[error("no inventory for product {product_id} in warehouse {warehouse_id}")]
    NoInventory {
        warehouse_id: WarehouseId,
        product_id: ProductId,
    },

    /// The ledger row exists but holds fewer units than requested.
    #[error(
        "insufficient stock for product {product_id} in warehouse {warehouse_id} \
         (requested {requested}, available {available})"
    )]
    InsufficientStock {
        warehouse_id: WarehouseId,
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// A referenced order, warehouse, product or customer does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated (e.g. duplicate order id).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage or transport failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn insufficient_stock(
        warehouse_id: WarehouseId,
        product_id: ProductId,
        requested: i64,
        available: i64,
    ) -> Self {
        Self::InsufficientStock {
            warehouse_id,
            product_id,
            requested,
            available,
        }
    }

    /// Stable machine-readable code, used by the transport layer.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::InvalidArgument(_) => "invalid_argument",
            DomainError::NoInventory { .. } => "no_inventory",
            DomainError::InsufficientStock { .. } => "insufficient_stock",
            DomainError::NotFound(_) => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::Internal(_) => "internal",
        }
    }

    /// Stock failures are detected inside a transaction and force a rollback.
    pub fn is_stock_error(&self) -> bool {
        matches!(
            self,
            DomainError::NoInventory { .. } | DomainError::InsufficientStock { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_names_the_pair() {
        let err = DomainError::insufficient_stock(WarehouseId::new(2), ProductId::new(5), 3, 1);
        assert_eq!(
            err.to_string(),
            "insufficient stock for product 5 in warehouse 2 (requested 3, available 1)"
        );
        assert_eq!(err.code(), "insufficient_stock");
        assert!(err.is_stock_error());
    }

    #[test]
    fn validation_errors_are_not_stock_errors() {
        assert!(!DomainError::invalid_argument("qty").is_stock_error());
        assert_eq!(DomainError::not_found("order 1").code(), "not_found");
    }
}
