use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::Utc;
use salesboard_catalog::{NewProduct, NewWarehouse};
use salesboard_core::{CustomerId, Money, ProductId, UserId, WarehouseId};
use salesboard_events::{EventBus, EventEnvelope, EventHub};
use salesboard_infra::{InMemoryStore, InventoryService, OrderFulfillmentEngine, Store, TransferService};
use salesboard_inventory::{StockLevel, TransferRequest, UpsertInventory};
use salesboard_sales::{OrderLineRequest, OrderRequest};
use std::sync::Arc;
use tokio::runtime::Runtime;

struct Setup {
    engine: OrderFulfillmentEngine,
    transfers: TransferService,
    warehouses: [WarehouseId; 2],
    products: Vec<ProductId>,
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("tokio runtime")
}

/// One store with two warehouses and `product_count` products, each stocked
/// deep enough that benchmarks never run out.
fn setup(rt: &Runtime, product_count: usize) -> Setup {
    rt.block_on(async {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let bus: Arc<dyn EventBus> = Arc::new(EventHub::new());

        let mut warehouses = [WarehouseId::new(0); 2];
        for (idx, slot) in warehouses.iter_mut().enumerate() {
            *slot = store
                .insert_warehouse(NewWarehouse {
                    name: format!("W{idx}"),
                    latitude: "0".into(),
                    longitude: "0".into(),
                    capacity: 0,
                })
                .await
                .unwrap()
                .id;
        }

        let mut products = Vec::with_capacity(product_count);
        for idx in 0..product_count {
            let product = store
                .insert_product(NewProduct {
                    name: format!("P{idx}"),
                    price: Money::from_minor(100),
                    stock: 0,
                })
                .await
                .unwrap();
            products.push(product.id);
        }

        let inventory = InventoryService::new(store.clone(), bus.clone());
        for &warehouse_id in &warehouses {
            inventory
                .upsert_inventory(UpsertInventory {
                    warehouse_id,
                    items: products
                        .iter()
                        .map(|&product_id| StockLevel {
                            product_id,
                            qty: i64::MAX / 4,
                        })
                        .collect(),
                })
                .await
                .unwrap();
        }

        Setup {
            engine: OrderFulfillmentEngine::new(store.clone(), bus.clone()),
            transfers: TransferService::new(store, bus),
            warehouses,
            products,
        }
    })
}

fn order_of(setup: &Setup, lines: usize) -> OrderRequest {
    OrderRequest {
        order_id: None,
        customer_id: CustomerId::new(1),
        user_id: UserId::new(1),
        created_at: None,
        product_items: setup.products[..lines]
            .iter()
            .map(|&product_id| OrderLineRequest {
                product_id,
                quantity: 1,
                sale_price: Money::from_minor(199),
                warehouse_id: setup.warehouses[0],
            })
            .collect(),
    }
}

/// Benchmark: create_order latency by number of lines.
fn bench_create_order(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("create_order");

    for lines in [1usize, 5, 20] {
        let setup = setup(&rt, lines);
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, &lines| {
            b.iter(|| {
                let request = order_of(&setup, lines);
                rt.block_on(setup.engine.create_order(black_box(request))).unwrap()
            })
        });
    }
    group.finish();
}

/// Benchmark: transfer latency (alternating direction so stock never drains).
fn bench_transfer(c: &mut Criterion) {
    let rt = runtime();
    let setup = setup(&rt, 1);
    let [north, south] = setup.warehouses;
    let mut flip = false;

    c.bench_function("transfer_stock", |b| {
        b.iter(|| {
            flip = !flip;
            let (from, to) = if flip { (north, south) } else { (south, north) };
            rt.block_on(setup.transfers.transfer_stock(TransferRequest {
                product_id: setup.products[0],
                from_warehouse_id: from,
                to_warehouse_id: to,
                qty: 1,
            }))
            .unwrap()
        })
    });
}

/// Benchmark: hub publish cost by subscriber count (mailboxes are drained so
/// every offer is accepted).
fn bench_hub_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("hub_publish");
    let envelope = EventEnvelope::new(
        "order.created",
        serde_json::json!({"orderId": 1, "totalPrice": 19.99}),
        Utc::now(),
    );

    for subscribers in [1usize, 16, 128] {
        let hub = EventHub::new();
        let mut subs: Vec<_> = (0..subscribers).map(|_| hub.subscribe()).collect();
        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    hub.publish(black_box(&envelope));
                    for sub in subs.iter_mut() {
                        black_box(sub.try_recv());
                    }
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_create_order, bench_transfer, bench_hub_fan_out);
criterion_main!(benches);
