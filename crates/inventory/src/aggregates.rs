//! Read-time views over ledger rows.
//!
//! Nothing here is stored. Counts and totals are recomputed from the rows the
//! caller read, so they cannot drift from the ledger.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use salesboard_catalog::Warehouse;
use salesboard_core::{ProductId, WarehouseId};

use crate::record::InventoryRecord;

/// Sum of `qty` for `product_id` across all warehouses.
pub fn total_stock(rows: &[InventoryRecord], product_id: ProductId) -> i64 {
    rows.iter()
        .filter(|r| r.product_id == product_id)
        .map(|r| r.qty)
        .sum()
}

/// Number of distinct products with `qty > 0` held by `warehouse_id`.
pub fn products_count(rows: &[InventoryRecord], warehouse_id: WarehouseId) -> i64 {
    let distinct: BTreeSet<ProductId> = rows
        .iter()
        .filter(|r| r.warehouse_id == warehouse_id && r.is_stocked())
        .map(|r| r.product_id)
        .collect();
    distinct.len() as i64
}

/// A warehouse together with its derived product count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseSummary {
    #[serde(flatten)]
    pub warehouse: Warehouse,
    pub products_count: i64,
}

impl WarehouseSummary {
    pub fn new(warehouse: Warehouse, products_count: i64) -> Self {
        Self {
            warehouse,
            products_count,
        }
    }
}

/// One product line in a warehouse's inventory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseInventoryLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub qty: i64,
}

/// Stock of one product in one warehouse, as seen from the product side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseStock {
    pub warehouse_id: WarehouseId,
    pub warehouse_name: String,
    pub qty: i64,
}

/// Where a product is held and how much of it exists in total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
    pub product_id: ProductId,
    pub total_stock: i64,
    pub warehouses: Vec<WarehouseStock>,
}

impl ProductStock {
    pub fn new(product_id: ProductId, mut warehouses: Vec<WarehouseStock>) -> Self {
        warehouses.sort_by_key(|w| w.warehouse_id);
        let total_stock = warehouses.iter().map(|w| w.qty).sum();
        Self {
            product_id,
            total_stock,
            warehouses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(w: i64, p: i64, qty: i64) -> InventoryRecord {
        InventoryRecord::new(WarehouseId::new(w), ProductId::new(p), qty)
    }

    fn warehouse(id: i64) -> Warehouse {
        Warehouse {
            id: WarehouseId::new(id),
            name: format!("W{id}"),
            latitude: "0".into(),
            longitude: "0".into(),
            capacity: 100,
        }
    }

    #[test]
    fn total_stock_sums_across_warehouses() {
        let rows = [row(1, 7, 5), row(2, 7, 3), row(2, 8, 9)];
        assert_eq!(total_stock(&rows, ProductId::new(7)), 8);
        assert_eq!(total_stock(&rows, ProductId::new(99)), 0);
    }

    #[test]
    fn products_count_ignores_empty_rows() {
        let rows = [row(1, 7, 5), row(1, 8, 0), row(1, 9, 2), row(2, 7, 4)];
        assert_eq!(products_count(&rows, WarehouseId::new(1)), 2);
        assert_eq!(products_count(&rows, WarehouseId::new(3)), 0);
    }

    #[test]
    fn summary_flattens_warehouse_fields() {
        let rows = [row(1, 7, 5), row(1, 8, 0)];
        let summary = WarehouseSummary::new(warehouse(1), products_count(&rows, WarehouseId::new(1)));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "W1");
        assert_eq!(json["productsCount"], 1);
    }

    #[test]
    fn product_stock_orders_by_warehouse_and_totals() {
        let stock = ProductStock::new(
            ProductId::new(7),
            vec![
                WarehouseStock {
                    warehouse_id: WarehouseId::new(2),
                    warehouse_name: "W2".into(),
                    qty: 3,
                },
                WarehouseStock {
                    warehouse_id: WarehouseId::new(1),
                    warehouse_name: "W1".into(),
                    qty: 5,
                },
            ],
        );
        assert_eq!(stock.total_stock, 8);
        assert_eq!(stock.warehouses[0].warehouse_id, WarehouseId::new(1));
    }
}
