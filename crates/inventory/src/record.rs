use serde::{Deserialize, Serialize};

use salesboard_core::{DomainError, DomainResult, ProductId, WarehouseId};

/// One ledger row: the quantity of a product held in a warehouse.
///
/// `(warehouse_id, product_id)` is unique. A missing row reads as `qty = 0`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub qty: i64,
}

impl InventoryRecord {
    pub fn new(warehouse_id: WarehouseId, product_id: ProductId, qty: i64) -> Self {
        Self {
            warehouse_id,
            product_id,
            qty,
        }
    }

    pub fn is_stocked(&self) -> bool {
        self.qty > 0
    }
}

/// New quantity after applying `delta` to `current`.
///
/// Fails with `InsufficientStock` if the result would be negative; the row is
/// left untouched by the caller in that case.
pub fn adjusted_qty(
    warehouse_id: WarehouseId,
    product_id: ProductId,
    current: i64,
    delta: i64,
) -> DomainResult<i64> {
    let next = current
        .checked_add(delta)
        .ok_or_else(|| DomainError::invalid_argument("quantity overflow"))?;
    if next < 0 {
        return Err(DomainError::insufficient_stock(
            warehouse_id,
            product_id,
            delta.saturating_neg(),
            current,
        ));
    }
    Ok(next)
}

/// Absolute quantities must be non-negative.
pub fn validate_absolute_qty(product_id: ProductId, qty: i64) -> DomainResult<i64> {
    if qty < 0 {
        return Err(DomainError::invalid_argument(format!(
            "qty for product {product_id} cannot be negative (got {qty})"
        )));
    }
    Ok(qty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const W: WarehouseId = WarehouseId::new(1);
    const P: ProductId = ProductId::new(1);

    #[test]
    fn decrement_to_zero_is_allowed() {
        assert_eq!(adjusted_qty(W, P, 3, -3), Ok(0));
    }

    #[test]
    fn decrement_below_zero_reports_requested_and_available() {
        let err = adjusted_qty(W, P, 2, -3).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(W, P, 3, 2));
    }

    #[test]
    fn overflow_is_invalid_argument() {
        assert!(matches!(
            adjusted_qty(W, P, i64::MAX, 1),
            Err(DomainError::InvalidArgument(_))
        ));
    }

    #[test]
    fn negative_absolute_qty_is_rejected() {
        assert!(validate_absolute_qty(P, -1).is_err());
        assert_eq!(validate_absolute_qty(P, 0), Ok(0));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Adjust(i64),
        Set(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-50i64..50).prop_map(Op::Adjust),
            (-5i64..100).prop_map(Op::Set),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whatever sequence of adjustments and absolute sets is
        /// attempted, a row that only changes through these rules never holds a
        /// negative quantity, and rejected operations leave it unchanged.
        #[test]
        fn qty_never_goes_negative(ops in proptest::collection::vec(op(), 1..64)) {
            let mut qty = 0i64;
            for op in ops {
                let before = qty;
                let result = match op {
                    Op::Adjust(delta) => adjusted_qty(W, P, qty, delta),
                    Op::Set(value) => validate_absolute_qty(P, value),
                };
                match result {
                    Ok(next) => qty = next,
                    Err(_) => prop_assert_eq!(qty, before),
                }
                prop_assert!(qty >= 0);
            }
        }

        /// Property: moving `q` units out of one row and into another keeps
        /// the sum constant, and moving them back restores both rows.
        #[test]
        fn paired_adjustments_conserve_quantity(
            from in 0i64..1_000,
            to in 0i64..1_000,
            q in 1i64..1_000,
        ) {
            let other = WarehouseId::new(2);
            match adjusted_qty(W, P, from, -q) {
                Ok(from_after) => {
                    let to_after = adjusted_qty(other, P, to, q).unwrap();
                    prop_assert_eq!(from_after + to_after, from + to);

                    let to_back = adjusted_qty(other, P, to_after, -q).unwrap();
                    let from_back = adjusted_qty(W, P, from_after, q).unwrap();
                    prop_assert_eq!((from_back, to_back), (from, to));
                }
                Err(e) => prop_assert!(e.is_stock_error() && from < q),
            }
        }
    }
}
