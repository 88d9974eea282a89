//! Integration tests for the transactional pipeline.
//!
//! Tests: Service → Ledger → Store (commit/rollback) → EventHub
//!
//! Verifies:
//! - multi-line orders are all-or-nothing
//! - transfers conserve quantity, also under concurrency
//! - racing orders never oversell
//! - events are published only for committed work
//! - catalog deletes keep ledger aggregates and order history consistent

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use salesboard_catalog::{NewCustomer, NewProduct, NewWarehouse};
    use salesboard_core::{CustomerId, DomainError, Money, OrderId, ProductId, UserId, WarehouseId};
    use salesboard_events::{EventBus, EventHub};
    use salesboard_inventory::{StockLevel, TransferRequest, UpsertInventory};
    use salesboard_sales::{OrderLineRequest, OrderRequest};

    use crate::catalog::CatalogService;
    use crate::fulfillment::{OrderDeletePolicy, OrderFulfillmentEngine};
    use crate::inventory_service::InventoryService;
    use crate::ledger::Ledger;
    use crate::store::{InMemoryStore, Store};
    use crate::transfer::TransferService;

    struct Fixture {
        store: Arc<InMemoryStore>,
        hub: Arc<EventHub>,
        catalog: CatalogService,
        ledger: Ledger,
        engine: OrderFulfillmentEngine,
        transfers: TransferService,
        inventory: InventoryService,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_policy(OrderDeletePolicy::Erase)
        }

        fn with_policy(policy: OrderDeletePolicy) -> Self {
            let store = Arc::new(InMemoryStore::new());
            let hub = Arc::new(EventHub::new());
            let dyn_store: Arc<dyn Store> = store.clone();
            let bus: Arc<dyn EventBus> = hub.clone();
            Self {
                catalog: CatalogService::new(dyn_store.clone()),
                ledger: Ledger::new(dyn_store.clone()),
                engine: OrderFulfillmentEngine::new(dyn_store.clone(), bus.clone())
                    .with_delete_policy(policy),
                transfers: TransferService::new(dyn_store.clone(), bus.clone()),
                inventory: InventoryService::new(dyn_store, bus),
                store,
                hub,
            }
        }

        async fn warehouse(&self, name: &str) -> WarehouseId {
            self.catalog
                .create_warehouse(NewWarehouse {
                    name: name.to_string(),
                    latitude: "43.65".into(),
                    longitude: "-79.38".into(),
                    capacity: 1_000,
                })
                .await
                .unwrap()
                .id
        }

        async fn product(&self, name: &str) -> ProductId {
            self.catalog
                .create_product(NewProduct {
                    name: name.to_string(),
                    price: Money::from_minor(1_000),
                    stock: 0,
                })
                .await
                .unwrap()
                .id
        }

        async fn stock(&self, warehouse_id: WarehouseId, product_id: ProductId, qty: i64) {
            self.inventory
                .upsert_inventory(UpsertInventory {
                    warehouse_id,
                    items: vec![StockLevel { product_id, qty }],
                })
                .await
                .unwrap();
        }

        async fn qty(&self, warehouse_id: WarehouseId, product_id: ProductId) -> i64 {
            self.ledger.get_qty(warehouse_id, product_id).await.unwrap()
        }
    }

    fn line(product_id: ProductId, warehouse_id: WarehouseId, quantity: i64, price: i64) -> OrderLineRequest {
        OrderLineRequest {
            product_id,
            quantity,
            sale_price: Money::from_minor(price),
            warehouse_id,
        }
    }

    fn order(lines: Vec<OrderLineRequest>) -> OrderRequest {
        OrderRequest {
            order_id: None,
            customer_id: CustomerId::new(1),
            user_id: UserId::new(1),
            created_at: None,
            product_items: lines,
        }
    }

    #[tokio::test]
    async fn order_commits_and_deducts_every_line() {
        let f = Fixture::new();
        let w = f.warehouse("North").await;
        let a = f.product("A").await;
        let b = f.product("B").await;
        f.stock(w, a, 10).await;
        f.stock(w, b, 4).await;

        let receipt = f
            .engine
            .create_order(order(vec![line(a, w, 3, 250), line(b, w, 4, 100)]))
            .await
            .unwrap();

        assert_eq!(receipt.total_price, Money::from_minor(3 * 250 + 4 * 100));
        assert_eq!(f.qty(w, a).await, 7);
        assert_eq!(f.qty(w, b).await, 0);

        let detail = f.engine.get_order(receipt.order_id).await.unwrap();
        assert_eq!(detail.order.total_price, receipt.total_price);
        assert_eq!(detail.lines.len(), 2);
        assert_eq!(detail.lines[0].warehouse_name, "North");
        assert_eq!(detail.lines[1].line.warehouse_id, w);
    }

    #[tokio::test]
    async fn failing_line_rolls_back_the_whole_order() {
        let f = Fixture::new();
        let w = f.warehouse("North").await;
        let a = f.product("A").await;
        let b = f.product("B").await;
        f.stock(w, a, 10).await;
        f.stock(w, b, 1).await;

        let err = f
            .engine
            .create_order(order(vec![line(a, w, 5, 100), line(b, w, 2, 100)]))
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::insufficient_stock(w, b, 2, 1));
        assert_eq!(f.qty(w, a).await, 10);
        assert_eq!(f.qty(w, b).await, 1);
        assert!(f.engine.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_ledger_row_is_no_inventory() {
        let f = Fixture::new();
        let w = f.warehouse("North").await;
        let a = f.product("A").await;

        let err = f
            .engine
            .create_order(order(vec![line(a, w, 1, 100)]))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::NoInventory {
                warehouse_id: w,
                product_id: a
            }
        );
    }

    #[tokio::test]
    async fn lines_draw_from_their_own_warehouse() {
        let f = Fixture::new();
        let north = f.warehouse("North").await;
        let south = f.warehouse("South").await;
        let a = f.product("A").await;
        f.stock(north, a, 2).await;
        f.stock(south, a, 5).await;

        f.engine
            .create_order(order(vec![line(a, north, 2, 100), line(a, south, 3, 100)]))
            .await
            .unwrap();

        assert_eq!(f.qty(north, a).await, 0);
        assert_eq!(f.qty(south, a).await, 2);
    }

    #[tokio::test]
    async fn duplicate_order_id_is_conflict_and_changes_nothing() {
        let f = Fixture::new();
        let w = f.warehouse("North").await;
        let a = f.product("A").await;
        f.stock(w, a, 10).await;

        let mut first = order(vec![line(a, w, 1, 100)]);
        first.order_id = Some(OrderId::new(42));
        let receipt = f.engine.create_order(first.clone()).await.unwrap();
        assert_eq!(receipt.order_id, OrderId::new(42));

        let err = f.engine.create_order(first).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(f.qty(w, a).await, 9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_orders_for_the_last_units_never_oversell() {
        let f = Fixture::new();
        let w = f.warehouse("North").await;
        let a = f.product("A").await;
        f.stock(w, a, 5).await;

        let first = {
            let engine = f.engine.clone();
            tokio::spawn(async move { engine.create_order(order(vec![line(a, w, 3, 100)])).await })
        };
        let second = {
            let engine = f.engine.clone();
            tokio::spawn(async move { engine.create_order(order(vec![line(a, w, 3, 100)])).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let short = results
            .iter()
            .filter(|r| matches!(r, Err(DomainError::InsufficientStock { .. })))
            .count();

        assert_eq!((ok, short), (1, 1));
        assert_eq!(f.qty(w, a).await, 2);
    }

    #[tokio::test]
    async fn transfer_round_trip_restores_both_rows() {
        let f = Fixture::new();
        let north = f.warehouse("North").await;
        let south = f.warehouse("South").await;
        let a = f.product("A").await;
        f.stock(north, a, 8).await;

        let there = TransferRequest {
            product_id: a,
            from_warehouse_id: north,
            to_warehouse_id: south,
            qty: 5,
        };
        f.transfers.transfer_stock(there).await.unwrap();
        assert_eq!((f.qty(north, a).await, f.qty(south, a).await), (3, 5));

        f.transfers
            .transfer_stock(TransferRequest {
                from_warehouse_id: south,
                to_warehouse_id: north,
                ..there
            })
            .await
            .unwrap();
        assert_eq!((f.qty(north, a).await, f.qty(south, a).await), (8, 0));
        assert_eq!(f.ledger.total_stock_for(a).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn transfer_rejects_shortfall_and_unknown_destination() {
        let f = Fixture::new();
        let north = f.warehouse("North").await;
        let south = f.warehouse("South").await;
        let a = f.product("A").await;
        f.stock(north, a, 2).await;

        let err = f
            .transfers
            .transfer_stock(TransferRequest {
                product_id: a,
                from_warehouse_id: north,
                to_warehouse_id: south,
                qty: 3,
            })
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(north, a, 3, 2));

        let err = f
            .transfers
            .transfer_stock(TransferRequest {
                product_id: a,
                from_warehouse_id: north,
                to_warehouse_id: WarehouseId::new(999),
                qty: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
        assert_eq!(f.qty(north, a).await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transfers_conserve_quantity() {
        let f = Fixture::new();
        let north = f.warehouse("North").await;
        let south = f.warehouse("South").await;
        let a = f.product("A").await;
        f.stock(north, a, 20).await;
        f.stock(south, a, 20).await;

        let mut tasks = Vec::new();
        for i in 0..40 {
            let transfers = f.transfers.clone();
            let (from, to) = if i % 2 == 0 { (north, south) } else { (south, north) };
            tasks.push(tokio::spawn(async move {
                transfers
                    .transfer_stock(TransferRequest {
                        product_id: a,
                        from_warehouse_id: from,
                        to_warehouse_id: to,
                        qty: 1 + (i % 7),
                    })
                    .await
            }));
        }
        for task in tasks {
            // Individual transfers may fail for lack of stock; none may break
            // conservation.
            let _ = task.await.unwrap();
        }

        let (n, s) = (f.qty(north, a).await, f.qty(south, a).await);
        assert!(n >= 0 && s >= 0);
        assert_eq!(n + s, 40);
    }

    #[tokio::test]
    async fn upsert_with_negative_qty_leaves_ledger_unchanged() {
        let f = Fixture::new();
        let w = f.warehouse("North").await;
        let a = f.product("A").await;
        let b = f.product("B").await;
        f.stock(w, a, 5).await;

        let err = f
            .inventory
            .upsert_inventory(UpsertInventory {
                warehouse_id: w,
                items: vec![
                    StockLevel { product_id: b, qty: 3 },
                    StockLevel { product_id: a, qty: -1 },
                ],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidArgument(_)));
        assert_eq!(f.qty(w, a).await, 5);
        assert_eq!(f.qty(w, b).await, 0);
    }

    #[tokio::test]
    async fn upsert_with_unknown_product_writes_nothing() {
        let f = Fixture::new();
        let w = f.warehouse("North").await;
        let a = f.product("A").await;

        let err = f
            .inventory
            .upsert_inventory(UpsertInventory {
                warehouse_id: w,
                items: vec![
                    StockLevel { product_id: a, qty: 3 },
                    StockLevel {
                        product_id: ProductId::new(77),
                        qty: 1,
                    },
                ],
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvalidArgument(_)));
        assert_eq!(f.qty(w, a).await, 0);
        assert_eq!(f.ledger.products_count_for(w).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn erase_policy_keeps_consumed_stock_consumed() {
        let f = Fixture::new();
        let w = f.warehouse("North").await;
        let a = f.product("A").await;
        f.stock(w, a, 5).await;

        let receipt = f
            .engine
            .create_order(order(vec![line(a, w, 2, 100)]))
            .await
            .unwrap();
        f.engine.delete_order(receipt.order_id).await.unwrap();

        assert_eq!(f.qty(w, a).await, 3);
        assert!(matches!(
            f.engine.get_order(receipt.order_id).await,
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            f.engine.delete_order(receipt.order_id).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn restock_policy_returns_quantities_to_source_warehouses() {
        let f = Fixture::with_policy(OrderDeletePolicy::Restock);
        let north = f.warehouse("North").await;
        let south = f.warehouse("South").await;
        let a = f.product("A").await;
        f.stock(north, a, 5).await;
        f.stock(south, a, 5).await;

        let receipt = f
            .engine
            .create_order(order(vec![line(a, north, 2, 100), line(a, south, 4, 100)]))
            .await
            .unwrap();
        assert_eq!((f.qty(north, a).await, f.qty(south, a).await), (3, 1));

        f.engine.delete_order(receipt.order_id).await.unwrap();
        assert_eq!((f.qty(north, a).await, f.qty(south, a).await), (5, 5));
    }

    #[tokio::test]
    async fn events_follow_commits_only() {
        let f = Fixture::new();
        let w = f.warehouse("North").await;
        let a = f.product("A").await;
        f.stock(w, a, 1).await;

        let mut sub = f.hub.subscribe();

        let _ = f
            .engine
            .create_order(order(vec![line(a, w, 2, 100)]))
            .await
            .unwrap_err();
        assert!(sub.try_recv().is_none());

        let receipt = f
            .engine
            .create_order(order(vec![line(a, w, 1, 150)]))
            .await
            .unwrap();

        let frame = sub.try_recv().expect("order.created frame");
        let wire: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(wire["type"], "order.created");
        assert_eq!(wire["data"]["orderId"], receipt.order_id.get());
        assert_eq!(wire["data"]["totalPrice"], 1.5);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn transfer_and_upsert_publish_their_events() {
        let f = Fixture::new();
        let north = f.warehouse("North").await;
        let south = f.warehouse("South").await;
        let a = f.product("A").await;

        let mut sub = f.hub.subscribe();
        f.stock(north, a, 4).await;
        f.transfers
            .transfer_stock(TransferRequest {
                product_id: a,
                from_warehouse_id: north,
                to_warehouse_id: south,
                qty: 4,
            })
            .await
            .unwrap();

        let updated: serde_json::Value =
            serde_json::from_str(&sub.try_recv().unwrap()).unwrap();
        assert_eq!(updated["type"], "warehouse.inventory_updated");
        assert_eq!(updated["data"]["count"], 1);

        let moved: serde_json::Value = serde_json::from_str(&sub.try_recv().unwrap()).unwrap();
        assert_eq!(moved["type"], "warehouse.inventory_transferred");
        assert_eq!(moved["data"]["qty"], 4);
    }

    #[tokio::test]
    async fn warehouse_summary_counts_stocked_products() {
        let f = Fixture::new();
        let w = f.warehouse("North").await;
        let a = f.product("A").await;
        let b = f.product("B").await;
        f.stock(w, a, 3).await;
        f.stock(w, b, 0).await;

        let summaries = f.ledger.warehouse_summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].products_count, 1);

        let stock = f.ledger.inventory_for_product(a).await.unwrap();
        assert_eq!(stock.total_stock, 3);
        assert_eq!(stock.warehouses[0].warehouse_name, "North");

        assert_eq!(f.store.ledger_rows().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn deleting_a_warehouse_drops_its_rows_and_keeps_order_history() {
        let f = Fixture::new();
        let north = f.warehouse("North").await;
        let south = f.warehouse("South").await;
        let a = f.product("A").await;
        f.stock(north, a, 10).await;
        f.stock(south, a, 5).await;

        let receipt = f
            .engine
            .create_order(order(vec![line(a, north, 3, 400)]))
            .await
            .unwrap();
        assert_eq!(f.ledger.total_stock_for(a).await.unwrap(), 12);

        f.catalog.delete_warehouse(north).await.unwrap();

        assert_eq!(f.ledger.total_stock_for(a).await.unwrap(), 5);
        assert_eq!(f.qty(north, a).await, 0);
        assert_eq!(f.store.ledger_rows().await.unwrap().len(), 1);
        let summaries = f.ledger.warehouse_summaries().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].warehouse.id, south);
        assert!(matches!(
            f.ledger.inventory_for_warehouse(north).await,
            Err(DomainError::NotFound(_))
        ));

        let detail = f.engine.get_order(receipt.order_id).await.unwrap();
        assert_eq!(detail.order.total_price, Money::from_minor(1_200));
        assert_eq!(detail.lines.len(), 1);
        assert_eq!(detail.lines[0].line.warehouse_id, north);
        assert_eq!(detail.lines[0].line.quantity, 3);
        assert_eq!(detail.lines[0].warehouse_name, "");

        assert!(matches!(
            f.catalog.delete_warehouse(north).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn restock_skips_lines_whose_warehouse_is_gone() {
        let f = Fixture::with_policy(OrderDeletePolicy::Restock);
        let north = f.warehouse("North").await;
        let south = f.warehouse("South").await;
        let a = f.product("A").await;
        f.stock(north, a, 5).await;
        f.stock(south, a, 5).await;

        let receipt = f
            .engine
            .create_order(order(vec![line(a, north, 2, 100), line(a, south, 1, 100)]))
            .await
            .unwrap();
        f.catalog.delete_warehouse(north).await.unwrap();

        f.engine.delete_order(receipt.order_id).await.unwrap();
        assert_eq!(f.qty(south, a).await, 5);
        assert_eq!(f.ledger.total_stock_for(a).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn stocked_product_cannot_be_deleted() {
        let f = Fixture::new();
        let w = f.warehouse("North").await;
        let a = f.product("A").await;
        f.stock(w, a, 2).await;

        assert!(matches!(
            f.catalog.delete_product(a).await,
            Err(DomainError::Conflict(_))
        ));
        assert_eq!(f.qty(w, a).await, 2);

        f.stock(w, a, 0).await;
        f.catalog.delete_product(a).await.unwrap();
        assert!(matches!(f.catalog.product(a).await, Err(DomainError::NotFound(_))));
        assert!(f.store.ledger_rows().await.unwrap().is_empty());
        assert!(matches!(
            f.catalog.delete_product(a).await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn catalog_updates_replace_fields() {
        let f = Fixture::new();
        let a = f.product("A").await;
        let updated = f
            .catalog
            .update_product(
                a,
                NewProduct {
                    name: "  Anvil ".into(),
                    price: Money::from_minor(1_999),
                    stock: 3,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Anvil");
        assert_eq!(f.catalog.product(a).await.unwrap().price, Money::from_minor(1_999));

        let w = f.warehouse("North").await;
        let moved = f
            .catalog
            .update_warehouse(
                w,
                NewWarehouse {
                    name: "North 2".into(),
                    latitude: "1".into(),
                    longitude: "2".into(),
                    capacity: 50,
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.capacity, 50);
        assert!(matches!(
            f.catalog
                .update_warehouse(
                    WarehouseId::new(99),
                    NewWarehouse {
                        name: "Ghost".into(),
                        latitude: "1".into(),
                        longitude: "2".into(),
                        capacity: 0,
                    },
                )
                .await,
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn customer_update_respects_email_uniqueness_and_delete_removes() {
        let f = Fixture::new();
        let customer = |name: &str, email: &str| NewCustomer {
            name: name.to_string(),
            email: email.to_string(),
            phone: String::new(),
            address: String::new(),
        };
        let ada = f.catalog.create_customer(customer("Ada", "ada@example.com")).await.unwrap();
        let bob = f.catalog.create_customer(customer("Bob", "bob@example.com")).await.unwrap();

        assert!(matches!(
            f.catalog
                .update_customer(bob.id, customer("Bob", "ADA@example.com"))
                .await,
            Err(DomainError::Conflict(_))
        ));
        let renamed = f
            .catalog
            .update_customer(ada.id, customer("Ada L.", "ada@example.com"))
            .await
            .unwrap();
        assert_eq!(renamed.name, "Ada L.");

        f.catalog.delete_customer(bob.id).await.unwrap();
        assert!(matches!(f.catalog.customer(bob.id).await, Err(DomainError::NotFound(_))));
        assert!(matches!(
            f.catalog.delete_customer(bob.id).await,
            Err(DomainError::NotFound(_))
        ));
        assert!(matches!(
            f.catalog.delete_customer(CustomerId::new(0)).await,
            Err(DomainError::InvalidArgument(_))
        ));
    }
}
