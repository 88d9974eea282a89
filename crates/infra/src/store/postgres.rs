//! Postgres-backed store.
//!
//! ## Locking
//!
//! Ledger rows are read with `SELECT … FOR UPDATE` inside the caller's
//! transaction, so two transactions touching the same `(warehouse, product)`
//! row run one after the other. Relative updates are written as
//! `qty = warehouse_inventory.qty + excluded.qty` and the table carries
//! `CHECK (qty >= 0)`, which catches any write that slipped past the service
//! checks.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError |
//! |----------------------|------------|
//! | `23505` unique violation | `UniqueViolation` |
//! | `23514` check violation | `CheckViolation` |
//! | `23503` foreign key violation | `ForeignKeyViolation` |
//! | anything else, pool/network errors | `Backend` |

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use salesboard_catalog::{Customer, NewCustomer, NewProduct, NewWarehouse, Product, Warehouse};
use salesboard_core::{CustomerId, Money, OrderId, ProductId, UserId, WarehouseId};
use salesboard_inventory::{InventoryRecord, WarehouseInventoryLine, WarehouseStock};
use salesboard_sales::{Order, OrderLine, OrderLineDetail};

use super::r#trait::{OrderShell, Store, StoreError, StoreTx};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        price: Money::from_minor(row.try_get("price")?),
        stock: row.try_get("stock")?,
    })
}

fn warehouse_from_row(row: &PgRow) -> Result<Warehouse, sqlx::Error> {
    Ok(Warehouse {
        id: WarehouseId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        capacity: row.try_get("capacity")?,
    })
}

fn customer_from_row(row: &PgRow) -> Result<Customer, sqlx::Error> {
    Ok(Customer {
        id: CustomerId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, sqlx::Error> {
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        customer_id: CustomerId::new(row.try_get("customer_id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        created_at,
        total_price: Money::from_minor(row.try_get("total_price")?),
    })
}

fn order_line_from_row(row: &PgRow) -> Result<OrderLine, sqlx::Error> {
    Ok(OrderLine {
        product_id: ProductId::new(row.try_get("product_id")?),
        warehouse_id: WarehouseId::new(row.try_get("warehouse_id")?),
        quantity: row.try_get("quantity")?,
        sale_price: Money::from_minor(row.try_get("sale_price")?),
    })
}

fn decode_all<T>(
    operation: &str,
    rows: &[PgRow],
    decode: impl Fn(&PgRow) -> Result<T, sqlx::Error>,
) -> Result<Vec<T>, StoreError> {
    rows.iter()
        .map(|row| decode(row).map_err(|e| map_sqlx_error(operation, e)))
        .collect()
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self), err)]
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresTx { tx }))
    }

    #[instrument(skip(self, product), err)]
    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, price, stock)
            VALUES ($1, $2, $3)
            RETURNING id, name, price, stock
            "#,
        )
        .bind(product.name.trim())
        .bind(product.price.minor())
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        product_from_row(&row).map_err(|e| map_sqlx_error("insert_product", e))
    }

    #[instrument(skip(self), err)]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query("SELECT id, name, price, stock FROM products WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref()
            .map(product_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_product", e))
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query("SELECT id, name, price, stock FROM products ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;
        decode_all("list_products", &rows, product_from_row)
    }

    #[instrument(skip(self, product), err)]
    async fn update_product(
        &self,
        id: ProductId,
        product: NewProduct,
    ) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE products SET name = $2, price = $3, stock = $4
            WHERE id = $1
            RETURNING id, name, price, stock
            "#,
        )
        .bind(id.get())
        .bind(product.name.trim())
        .bind(product.price.minor())
        .bind(product.stock)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;
        row.as_ref()
            .map(product_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("update_product", e))
    }

    #[instrument(skip(self, warehouse), err)]
    async fn insert_warehouse(&self, warehouse: NewWarehouse) -> Result<Warehouse, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO warehouses (name, latitude, longitude, capacity)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, latitude, longitude, capacity
            "#,
        )
        .bind(warehouse.name.trim())
        .bind(warehouse.latitude.trim())
        .bind(warehouse.longitude.trim())
        .bind(warehouse.capacity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_warehouse", e))?;
        warehouse_from_row(&row).map_err(|e| map_sqlx_error("insert_warehouse", e))
    }

    #[instrument(skip(self), err)]
    async fn get_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, latitude, longitude, capacity FROM warehouses WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_warehouse", e))?;
        row.as_ref()
            .map(warehouse_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_warehouse", e))
    }

    #[instrument(skip(self), err)]
    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, latitude, longitude, capacity FROM warehouses ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_warehouses", e))?;
        decode_all("list_warehouses", &rows, warehouse_from_row)
    }

    #[instrument(skip(self, warehouse), err)]
    async fn update_warehouse(
        &self,
        id: WarehouseId,
        warehouse: NewWarehouse,
    ) -> Result<Option<Warehouse>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE warehouses SET name = $2, latitude = $3, longitude = $4, capacity = $5
            WHERE id = $1
            RETURNING id, name, latitude, longitude, capacity
            "#,
        )
        .bind(id.get())
        .bind(warehouse.name.trim())
        .bind(warehouse.latitude.trim())
        .bind(warehouse.longitude.trim())
        .bind(warehouse.capacity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_warehouse", e))?;
        row.as_ref()
            .map(warehouse_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("update_warehouse", e))
    }

    #[instrument(skip(self, customer), err)]
    async fn insert_customer(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO customers (name, email, phone, address)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, phone, address
            "#,
        )
        .bind(customer.name.trim())
        .bind(customer.email.trim().to_lowercase())
        .bind(&customer.phone)
        .bind(&customer.address)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_customer", e))?;
        customer_from_row(&row).map_err(|e| map_sqlx_error("insert_customer", e))
    }

    #[instrument(skip(self), err)]
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, address FROM customers WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_customer", e))?;
        row.as_ref()
            .map(customer_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_customer", e))
    }

    #[instrument(skip(self), err)]
    async fn list_customers(&self) -> Result<Vec<Customer>, StoreError> {
        let rows = sqlx::query("SELECT id, name, email, phone, address FROM customers ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_customers", e))?;
        decode_all("list_customers", &rows, customer_from_row)
    }

    #[instrument(skip(self, customer), err)]
    async fn update_customer(
        &self,
        id: CustomerId,
        customer: NewCustomer,
    ) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE customers SET name = $2, email = $3, phone = $4, address = $5
            WHERE id = $1
            RETURNING id, name, email, phone, address
            "#,
        )
        .bind(id.get())
        .bind(customer.name.trim())
        .bind(customer.email.trim().to_lowercase())
        .bind(&customer.phone)
        .bind(&customer.address)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_customer", e))?;
        row.as_ref()
            .map(customer_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("update_customer", e))
    }

    #[instrument(skip(self), err)]
    async fn delete_customer(&self, id: CustomerId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_customer", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn ledger_qty(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<Option<i64>, StoreError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT qty FROM warehouse_inventory WHERE warehouse_id = $1 AND product_id = $2",
        )
        .bind(warehouse_id.get())
        .bind(product_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("ledger_qty", e))
    }

    #[instrument(skip(self), err)]
    async fn ledger_rows(&self) -> Result<Vec<InventoryRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT warehouse_id, product_id, qty FROM warehouse_inventory \
             ORDER BY warehouse_id, product_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("ledger_rows", e))?;
        decode_all("ledger_rows", &rows, |row| {
            Ok(InventoryRecord::new(
                WarehouseId::new(row.try_get("warehouse_id")?),
                ProductId::new(row.try_get("product_id")?),
                row.try_get("qty")?,
            ))
        })
    }

    #[instrument(skip(self), err)]
    async fn product_total(&self, product_id: ProductId) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(qty), 0)::BIGINT FROM warehouse_inventory WHERE product_id = $1",
        )
        .bind(product_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("product_total", e))
    }

    #[instrument(skip(self), err)]
    async fn products_count(&self, warehouse_id: WarehouseId) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM warehouse_inventory WHERE warehouse_id = $1 AND qty > 0",
        )
        .bind(warehouse_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products_count", e))
    }

    #[instrument(skip(self), err)]
    async fn products_counts(&self) -> Result<BTreeMap<WarehouseId, i64>, StoreError> {
        let rows = sqlx::query(
            "SELECT warehouse_id, COUNT(*) AS products FROM warehouse_inventory \
             WHERE qty > 0 GROUP BY warehouse_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products_counts", e))?;
        Ok(decode_all("products_counts", &rows, |row| {
            Ok((
                WarehouseId::new(row.try_get("warehouse_id")?),
                row.try_get::<i64, _>("products")?,
            ))
        })?
        .into_iter()
        .collect())
    }

    #[instrument(skip(self), err)]
    async fn warehouse_inventory(
        &self,
        warehouse_id: WarehouseId,
    ) -> Result<Vec<WarehouseInventoryLine>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT wi.product_id, COALESCE(p.name, '') AS product_name, wi.qty
            FROM warehouse_inventory wi
            LEFT JOIN products p ON p.id = wi.product_id
            WHERE wi.warehouse_id = $1
            ORDER BY wi.product_id
            "#,
        )
        .bind(warehouse_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("warehouse_inventory", e))?;
        decode_all("warehouse_inventory", &rows, |row| {
            Ok(WarehouseInventoryLine {
                product_id: ProductId::new(row.try_get("product_id")?),
                product_name: row.try_get("product_name")?,
                qty: row.try_get("qty")?,
            })
        })
    }

    #[instrument(skip(self), err)]
    async fn product_inventory(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<WarehouseStock>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT wi.warehouse_id, COALESCE(w.name, '') AS warehouse_name, wi.qty
            FROM warehouse_inventory wi
            LEFT JOIN warehouses w ON w.id = wi.warehouse_id
            WHERE wi.product_id = $1
            ORDER BY wi.warehouse_id
            "#,
        )
        .bind(product_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("product_inventory", e))?;
        decode_all("product_inventory", &rows, |row| {
            Ok(WarehouseStock {
                warehouse_id: WarehouseId::new(row.try_get("warehouse_id")?),
                warehouse_name: row.try_get("warehouse_name")?,
                qty: row.try_get("qty")?,
            })
        })
    }

    #[instrument(skip(self), err)]
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            "SELECT id, customer_id, user_id, created_at, total_price FROM orders WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;
        row.as_ref()
            .map(order_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("get_order", e))
    }

    #[instrument(skip(self), err)]
    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, customer_id, user_id, created_at, total_price FROM orders ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;
        decode_all("list_orders", &rows, order_from_row)
    }

    #[instrument(skip(self), err)]
    async fn order_lines(&self, id: OrderId) -> Result<Vec<OrderLineDetail>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT oi.product_id, oi.warehouse_id, oi.quantity, oi.sale_price,
                   COALESCE(w.name, '') AS warehouse_name
            FROM order_items oi
            LEFT JOIN warehouses w ON w.id = oi.warehouse_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            "#,
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("order_lines", e))?;
        decode_all("order_lines", &rows, |row| {
            Ok(OrderLineDetail {
                line: order_line_from_row(row)?,
                warehouse_name: row.try_get("warehouse_name")?,
            })
        })
    }
}

/// An open Postgres transaction. Dropping it without `commit` rolls back.
struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PostgresTx {
    async fn warehouse_exists(&mut self, id: WarehouseId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM warehouses WHERE id = $1)")
            .bind(id.get())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("warehouse_exists", e))
    }

    async fn product_exists(&mut self, id: ProductId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(id.get())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("product_exists", e))
    }

    #[instrument(skip(self), err)]
    async fn lock_ledger_row(
        &mut self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<Option<i64>, StoreError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT qty FROM warehouse_inventory
            WHERE warehouse_id = $1 AND product_id = $2
            FOR UPDATE
            "#,
        )
        .bind(warehouse_id.get())
        .bind(product_id.get())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_ledger_row", e))
    }

    #[instrument(skip(self), err)]
    async fn add_to_ledger_row(
        &mut self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<i64, StoreError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO warehouse_inventory (warehouse_id, product_id, qty)
            VALUES ($1, $2, $3)
            ON CONFLICT (warehouse_id, product_id)
            DO UPDATE SET qty = warehouse_inventory.qty + EXCLUDED.qty
            RETURNING qty
            "#,
        )
        .bind(warehouse_id.get())
        .bind(product_id.get())
        .bind(delta)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("add_to_ledger_row", e))
    }

    #[instrument(skip(self), err)]
    async fn put_ledger_row(
        &mut self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        qty: i64,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO warehouse_inventory (warehouse_id, product_id, qty)
            VALUES ($1, $2, $3)
            ON CONFLICT (warehouse_id, product_id)
            DO UPDATE SET qty = EXCLUDED.qty
            "#,
        )
        .bind(warehouse_id.get())
        .bind(product_id.get())
        .bind(qty)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("put_ledger_row", e))?;
        Ok(())
    }

    #[instrument(skip(self, shell), fields(order_id = ?shell.id), err)]
    async fn insert_order(&mut self, shell: &OrderShell) -> Result<OrderId, StoreError> {
        let id = match shell.id {
            Some(id) => {
                sqlx::query(
                    r#"
                    INSERT INTO orders (id, customer_id, user_id, created_at, total_price)
                    VALUES ($1, $2, $3, $4, 0)
                    "#,
                )
                .bind(id.get())
                .bind(shell.customer_id.get())
                .bind(shell.user_id.get())
                .bind(shell.created_at)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("insert_order", e))?;

                // Keep the sequence ahead of caller-supplied ids. It only moves
                // forward, so ids of deleted orders are never handed out again.
                sqlx::query(
                    "SELECT setval('orders_id_seq', \
                     GREATEST($1, (SELECT last_value FROM orders_id_seq)))",
                )
                .bind(id.get())
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("insert_order", e))?;
                id
            }
            None => {
                let raw = sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO orders (customer_id, user_id, created_at, total_price)
                    VALUES ($1, $2, $3, 0)
                    RETURNING id
                    "#,
                )
                .bind(shell.customer_id.get())
                .bind(shell.user_id.get())
                .bind(shell.created_at)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("insert_order", e))?;
                OrderId::new(raw)
            }
        };
        Ok(id)
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &OrderLine,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO order_items (order_id, product_id, warehouse_id, quantity, sale_price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id.get())
        .bind(line.product_id.get())
        .bind(line.warehouse_id.get())
        .bind(line.quantity)
        .bind(line.sale_price.minor())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order_line", e))?;
        Ok(())
    }

    async fn set_order_total(&mut self, order_id: OrderId, total: Money) -> Result<(), StoreError> {
        sqlx::query("UPDATE orders SET total_price = $2 WHERE id = $1")
            .bind(order_id.get())
            .bind(total.minor())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("set_order_total", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Vec<OrderLine>>, StoreError> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id.get())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("lock_order", e))?;
        if exists.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query(
            r#"
            SELECT product_id, warehouse_id, quantity, sale_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id.get())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("lock_order", e))?;
        decode_all("lock_order", &rows, order_line_from_row).map(Some)
    }

    async fn delete_order(&mut self, order_id: OrderId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order_items", e))?;
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;
        Ok(())
    }

    async fn delete_warehouse(&mut self, id: WarehouseId) -> Result<bool, StoreError> {
        sqlx::query("DELETE FROM warehouse_inventory WHERE warehouse_id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_warehouse_rows", e))?;
        let result = sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_warehouse", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<bool, StoreError> {
        sqlx::query("DELETE FROM warehouse_inventory WHERE product_id = $1 AND qty = 0")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product_rows", e))?;
        // Stocked rows still reference the product; the RESTRICT key rejects it.
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::UniqueViolation(msg),
                Some("23514") => StoreError::CheckViolation(msg),
                Some("23503") => StoreError::ForeignKeyViolation(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
