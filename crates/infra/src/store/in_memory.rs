use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use salesboard_catalog::{Customer, NewCustomer, NewProduct, NewWarehouse, Product, Warehouse};
use salesboard_core::{CustomerId, Money, OrderId, ProductId, WarehouseId};
use salesboard_inventory::{
    products_count, total_stock, InventoryRecord, WarehouseInventoryLine, WarehouseStock,
};
use salesboard_sales::{Order, OrderLine, OrderLineDetail};

use super::r#trait::{OrderShell, Store, StoreError, StoreTx};

#[derive(Debug, Clone, Default)]
struct State {
    products: BTreeMap<ProductId, Product>,
    warehouses: BTreeMap<WarehouseId, Warehouse>,
    customers: BTreeMap<CustomerId, Customer>,
    ledger: BTreeMap<(WarehouseId, ProductId), i64>,
    orders: BTreeMap<OrderId, Order>,
    order_lines: BTreeMap<OrderId, Vec<OrderLine>>,
    last_product_id: i64,
    last_warehouse_id: i64,
    last_customer_id: i64,
    last_order_id: i64,
}

impl State {
    fn warehouse_name(&self, id: WarehouseId) -> String {
        self.warehouses
            .get(&id)
            .map(|w| w.name.clone())
            .unwrap_or_default()
    }
}

/// In-memory store.
///
/// Intended for tests/dev. A transaction holds the store lock from `begin`
/// until it ends and works on a private copy of the state, so transactions are
/// fully serialized and a dropped transaction leaves no trace.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(InMemoryTx { guard, work }))
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut state = self.state.lock().await;
        state.last_product_id += 1;
        let product = product.into_product(ProductId::new(state.last_product_id));
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.state.lock().await.products.values().cloned().collect())
    }

    async fn update_product(
        &self,
        id: ProductId,
        product: NewProduct,
    ) -> Result<Option<Product>, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.products.get_mut(&id).map(|slot| {
            *slot = product.into_product(id);
            slot.clone()
        }))
    }

    async fn insert_warehouse(&self, warehouse: NewWarehouse) -> Result<Warehouse, StoreError> {
        let mut state = self.state.lock().await;
        state.last_warehouse_id += 1;
        let warehouse = warehouse.into_warehouse(WarehouseId::new(state.last_warehouse_id));
        state.warehouses.insert(warehouse.id, warehouse.clone());
        Ok(warehouse)
    }

    async fn get_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError> {
        Ok(self.state.lock().await.warehouses.get(&id).cloned())
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, StoreError> {
        Ok(self.state.lock().await.warehouses.values().cloned().collect())
    }

    async fn update_warehouse(
        &self,
        id: WarehouseId,
        warehouse: NewWarehouse,
    ) -> Result<Option<Warehouse>, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state.warehouses.get_mut(&id).map(|slot| {
            *slot = warehouse.into_warehouse(id);
            slot.clone()
        }))
    }

    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        let mut state = self.state.lock().await;
        let candidate = customer.into_customer(CustomerId::new(state.last_customer_id + 1));
        if state.customers.values().any(|c| c.email == candidate.email) {
            return Err(StoreError::UniqueViolation(format!(
                "customer email {} already exists",
                candidate.email
            )));
        }
        state.last_customer_id += 1;
        state.customers.insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        Ok(self.state.lock().await.customers.get(&id).cloned())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        Ok(self.state.lock().await.customers.values().cloned().collect())
    }

    async fn update_customer(
        &self,
        id: CustomerId,
        customer: NewCustomer,
    ) -> Result<Option<Customer>, StoreError> {
        let mut state = self.state.lock().await;
        if !state.customers.contains_key(&id) {
            return Ok(None);
        }
        let candidate = customer.into_customer(id);
        if state
            .customers
            .values()
            .any(|c| c.id != id && c.email == candidate.email)
        {
            return Err(StoreError::UniqueViolation(format!(
                "customer email {} already exists",
                candidate.email
            )));
        }
        state.customers.insert(id, candidate.clone());
        Ok(Some(candidate))
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<bool, StoreError> {
        Ok(self.state.lock().await.customers.remove(&id).is_some())
    }

    async fn ledger_qty(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<Option<i64>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .ledger
            .get(&(warehouse_id, product_id))
            .copied())
    }

    async fn ledger_rows(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .ledger
            .iter()
            .map(|(&(w, p), &qty)| InventoryRecord::new(w, p, qty))
            .collect())
    }

    async fn product_total(&self, product_id: ProductId) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        let rows: Vec<InventoryRecord> = state
            .ledger
            .iter()
            .filter(|((_, p), _)| *p == product_id)
            .map(|(&(w, p), &qty)| InventoryRecord::new(w, p, qty))
            .collect();
        Ok(total_stock(&rows, product_id))
    }

    async fn products_count(&self, warehouse_id: WarehouseId) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        let rows: Vec<InventoryRecord> = state
            .ledger
            .range((warehouse_id, ProductId::new(i64::MIN))..=(warehouse_id, ProductId::new(i64::MAX)))
            .map(|(&(w, p), &qty)| InventoryRecord::new(w, p, qty))
            .collect();
        Ok(products_count(&rows, warehouse_id))
    }

    async fn products_counts(&self) -> Result<BTreeMap<WarehouseId, i64>, StoreError> {
        let state = self.state.lock().await;
        let mut counts = BTreeMap::new();
        for (&(warehouse_id, _), &qty) in &state.ledger {
            if qty > 0 {
                *counts.entry(warehouse_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn warehouse_inventory(
        &self,
        warehouse_id: WarehouseId,
    ) -> Result<Vec<WarehouseInventoryLine>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .ledger
            .range((warehouse_id, ProductId::new(i64::MIN))..=(warehouse_id, ProductId::new(i64::MAX)))
            .map(|(&(_, product_id), &qty)| WarehouseInventoryLine {
                product_id,
                product_name: state
                    .products
                    .get(&product_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                qty,
            })
            .collect())
    }

    async fn product_inventory(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<WarehouseStock>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .ledger
            .iter()
            .filter(|((_, p), _)| *p == product_id)
            .map(|(&(warehouse_id, _), &qty)| WarehouseStock {
                warehouse_id,
                warehouse_name: state.warehouse_name(warehouse_id),
                qty,
            })
            .collect())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.state.lock().await.orders.values().cloned().collect())
    }

    async fn order_lines(&self, id: OrderId) -> Result<Vec<OrderLineDetail>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .order_lines
            .get(&id)
            .map(|lines| {
                lines
                    .iter()
                    .map(|line| OrderLineDetail {
                        line: line.clone(),
                        warehouse_name: state.warehouse_name(line.warehouse_id),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<State>,
    work: State,
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn warehouse_exists(&mut self, id: WarehouseId) -> Result<bool, StoreError> {
        Ok(self.work.warehouses.contains_key(&id))
    }

    async fn product_exists(&mut self, id: ProductId) -> Result<bool, StoreError> {
        Ok(self.work.products.contains_key(&id))
    }

    async fn lock_ledger_row(
        &mut self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<Option<i64>, StoreError> {
        Ok(self.work.ledger.get(&(warehouse_id, product_id)).copied())
    }

    async fn add_to_ledger_row(
        &mut self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<i64, StoreError> {
        if !self.work.warehouses.contains_key(&warehouse_id)
            || !self.work.products.contains_key(&product_id)
        {
            return Err(StoreError::ForeignKeyViolation(format!(
                "ledger row ({warehouse_id}, {product_id}) references a missing warehouse or product"
            )));
        }
        let row = self.work.ledger.entry((warehouse_id, product_id)).or_insert(0);
        let next = row
            .checked_add(delta)
            .filter(|q| *q >= 0)
            .ok_or_else(|| {
                StoreError::CheckViolation(format!(
                    "qty for ({warehouse_id}, {product_id}) would become negative"
                ))
            })?;
        *row = next;
        Ok(next)
    }

    async fn put_ledger_row(
        &mut self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        qty: i64,
    ) -> Result<(), StoreError> {
        if qty < 0 {
            return Err(StoreError::CheckViolation(format!(
                "qty for ({warehouse_id}, {product_id}) cannot be negative"
            )));
        }
        self.work.ledger.insert((warehouse_id, product_id), qty);
        Ok(())
    }

    async fn insert_order(&mut self, shell: &OrderShell) -> Result<OrderId, StoreError> {
        let id = match shell.id {
            Some(id) if self.work.orders.contains_key(&id) => {
                return Err(StoreError::UniqueViolation(format!("order {id} already exists")));
            }
            Some(id) => id,
            None => OrderId::new(self.work.last_order_id + 1),
        };
        self.work.last_order_id = self.work.last_order_id.max(id.get());
        self.work.orders.insert(
            id,
            Order {
                id,
                customer_id: shell.customer_id,
                user_id: shell.user_id,
                created_at: shell.created_at,
                total_price: Money::ZERO,
            },
        );
        Ok(id)
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &OrderLine,
    ) -> Result<(), StoreError> {
        if !self.work.orders.contains_key(&order_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "order {order_id} does not exist"
            )));
        }
        self.work
            .order_lines
            .entry(order_id)
            .or_default()
            .push(line.clone());
        Ok(())
    }

    async fn set_order_total(&mut self, order_id: OrderId, total: Money) -> Result<(), StoreError> {
        match self.work.orders.get_mut(&order_id) {
            Some(order) => {
                order.total_price = total;
                Ok(())
            }
            None => Err(StoreError::Backend(format!("order {order_id} vanished"))),
        }
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Vec<OrderLine>>, StoreError> {
        if !self.work.orders.contains_key(&order_id) {
            return Ok(None);
        }
        Ok(Some(
            self.work.order_lines.get(&order_id).cloned().unwrap_or_default(),
        ))
    }

    async fn delete_order(&mut self, order_id: OrderId) -> Result<(), StoreError> {
        self.work.orders.remove(&order_id);
        self.work.order_lines.remove(&order_id);
        Ok(())
    }

    async fn delete_warehouse(&mut self, id: WarehouseId) -> Result<bool, StoreError> {
        if self.work.warehouses.remove(&id).is_none() {
            return Ok(false);
        }
        self.work.ledger.retain(|&(w, _), _| w != id);
        Ok(true)
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool, StoreError> {
        if !self.work.products.contains_key(&id) {
            return Ok(false);
        }
        if let Some(&(w, _)) = self
            .work
            .ledger
            .iter()
            .find(|(key, qty)| key.1 == id && **qty > 0)
            .map(|(key, _)| key)
        {
            return Err(StoreError::ForeignKeyViolation(format!(
                "product {id} is still stocked in warehouse {w}"
            )));
        }
        self.work.ledger.retain(|&(_, p), _| p != id);
        self.work.products.remove(&id);
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (InMemoryStore, WarehouseId, ProductId) {
        let store = InMemoryStore::new();
        let w = store
            .insert_warehouse(NewWarehouse {
                name: "North".into(),
                latitude: "1".into(),
                longitude: "2".into(),
                capacity: 10,
            })
            .await
            .unwrap();
        let p = store
            .insert_product(NewProduct {
                name: "Bolt".into(),
                price: Money::from_minor(100),
                stock: 0,
            })
            .await
            .unwrap();
        (store, w.id, p.id)
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_no_trace() {
        let (store, w, p) = seeded().await;
        {
            let mut tx = store.begin().await.unwrap();
            tx.put_ledger_row(w, p, 5).await.unwrap();
        }
        assert_eq!(store.ledger_qty(w, p).await.unwrap(), None);

        let mut tx = store.begin().await.unwrap();
        tx.put_ledger_row(w, p, 5).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.ledger_qty(w, p).await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn relative_add_rejects_negative_result() {
        let (store, w, p) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.add_to_ledger_row(w, p, 3).await.unwrap(), 3);
        assert!(matches!(
            tx.add_to_ledger_row(w, p, -4).await,
            Err(StoreError::CheckViolation(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_customer_email_is_a_unique_violation() {
        let store = InMemoryStore::new();
        let new = NewCustomer {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: String::new(),
            address: String::new(),
        };
        store.insert_customer(new.clone()).await.unwrap();
        assert!(matches!(
            store.insert_customer(new).await,
            Err(StoreError::UniqueViolation(_))
        ));
    }

    #[tokio::test]
    async fn assigned_order_ids_skip_caller_supplied_ones() {
        let (store, _, _) = seeded().await;
        let shell = |id| OrderShell {
            id,
            customer_id: CustomerId::new(1),
            user_id: salesboard_core::UserId::new(1),
            created_at: chrono::Utc::now(),
        };
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.insert_order(&shell(Some(OrderId::new(7)))).await.unwrap(), OrderId::new(7));
        assert_eq!(tx.insert_order(&shell(None)).await.unwrap(), OrderId::new(8));
        assert!(matches!(
            tx.insert_order(&shell(Some(OrderId::new(7)))).await,
            Err(StoreError::UniqueViolation(_))
        ));
    }

    #[tokio::test]
    async fn order_ids_are_not_reused_after_delete() {
        let (store, _, _) = seeded().await;
        let shell = |id| OrderShell {
            id,
            customer_id: CustomerId::new(1),
            user_id: salesboard_core::UserId::new(1),
            created_at: chrono::Utc::now(),
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&shell(Some(OrderId::new(50)))).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.delete_order(OrderId::new(50)).await.unwrap();
        // A lower caller-supplied id does not pull the counter back.
        tx.insert_order(&shell(Some(OrderId::new(3)))).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.insert_order(&shell(None)).await.unwrap(), OrderId::new(51));
    }

    #[tokio::test]
    async fn aggregates_scan_only_the_requested_keys() {
        let (store, w1, p1) = seeded().await;
        let w2 = store
            .insert_warehouse(NewWarehouse {
                name: "South".into(),
                latitude: "3".into(),
                longitude: "4".into(),
                capacity: 10,
            })
            .await
            .unwrap()
            .id;
        let p2 = store
            .insert_product(NewProduct {
                name: "Nut".into(),
                price: Money::from_minor(5),
                stock: 0,
            })
            .await
            .unwrap()
            .id;

        let mut tx = store.begin().await.unwrap();
        tx.put_ledger_row(w1, p1, 4).await.unwrap();
        tx.put_ledger_row(w1, p2, 0).await.unwrap();
        tx.put_ledger_row(w2, p1, 6).await.unwrap();
        tx.put_ledger_row(w2, p2, 1).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.product_total(p1).await.unwrap(), 10);
        assert_eq!(store.product_total(p2).await.unwrap(), 1);
        assert_eq!(store.product_total(ProductId::new(99)).await.unwrap(), 0);
        assert_eq!(store.products_count(w1).await.unwrap(), 1);
        assert_eq!(store.products_count(w2).await.unwrap(), 2);

        let counts = store.products_counts().await.unwrap();
        assert_eq!(counts.get(&w1), Some(&1));
        assert_eq!(counts.get(&w2), Some(&2));
    }

    #[tokio::test]
    async fn warehouse_delete_takes_its_rows_and_waits_for_commit() {
        let (store, w, p) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.put_ledger_row(w, p, 3).await.unwrap();
        tx.commit().await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            assert!(tx.delete_warehouse(w).await.unwrap());
        }
        assert_eq!(store.ledger_qty(w, p).await.unwrap(), Some(3));

        let mut tx = store.begin().await.unwrap();
        assert!(tx.delete_warehouse(w).await.unwrap());
        tx.commit().await.unwrap();
        assert_eq!(store.ledger_qty(w, p).await.unwrap(), None);
        assert_eq!(store.product_total(p).await.unwrap(), 0);
        assert!(store.get_warehouse(w).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stocked_product_delete_is_a_foreign_key_violation() {
        let (store, w, p) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.put_ledger_row(w, p, 1).await.unwrap();
        assert!(matches!(
            tx.delete_product(p).await,
            Err(StoreError::ForeignKeyViolation(_))
        ));
        tx.put_ledger_row(w, p, 0).await.unwrap();
        assert!(tx.delete_product(p).await.unwrap());
        assert!(!tx.delete_product(p).await.unwrap());
        tx.commit().await.unwrap();
        assert_eq!(store.ledger_qty(w, p).await.unwrap(), None);
    }
}
