//! Catalog records: products, warehouses and customers.

use std::sync::Arc;

use tracing::instrument;

use salesboard_catalog::{Customer, NewCustomer, NewProduct, NewWarehouse, Product, Warehouse};
use salesboard_core::{CustomerId, DomainError, DomainResult, ProductId, WarehouseId};

use crate::store::{Store, StoreError};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, product), err)]
    pub async fn create_product(&self, product: NewProduct) -> DomainResult<Product> {
        product.validate()?;
        Ok(self.store.insert_product(product).await?)
    }

    pub async fn product(&self, id: ProductId) -> DomainResult<Product> {
        id.ensure_valid("productId")?;
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))
    }

    pub async fn products(&self) -> DomainResult<Vec<Product>> {
        Ok(self.store.list_products().await?)
    }

    #[instrument(skip(self, product), err)]
    pub async fn update_product(&self, id: ProductId, product: NewProduct) -> DomainResult<Product> {
        id.ensure_valid("productId")?;
        product.validate()?;
        self.store
            .update_product(id, product)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))
    }

    /// A product still stocked anywhere cannot be deleted. Order lines keep
    /// their `productId`.
    #[instrument(skip(self), err)]
    pub async fn delete_product(&self, id: ProductId) -> DomainResult<()> {
        id.ensure_valid("productId")?;
        let mut tx = self.store.begin().await?;
        let deleted = tx.delete_product(id).await.map_err(|e| match e {
            StoreError::ForeignKeyViolation(_) => {
                DomainError::conflict(format!("product {id} still has stock in a warehouse"))
            }
            other => other.into(),
        })?;
        if !deleted {
            return Err(DomainError::not_found(format!("product {id}")));
        }
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, warehouse), err)]
    pub async fn create_warehouse(&self, warehouse: NewWarehouse) -> DomainResult<Warehouse> {
        warehouse.validate()?;
        Ok(self.store.insert_warehouse(warehouse).await?)
    }

    pub async fn warehouse(&self, id: WarehouseId) -> DomainResult<Warehouse> {
        id.ensure_valid("warehouseId")?;
        self.store
            .get_warehouse(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("warehouse {id}")))
    }

    #[instrument(skip(self, warehouse), err)]
    pub async fn update_warehouse(
        &self,
        id: WarehouseId,
        warehouse: NewWarehouse,
    ) -> DomainResult<Warehouse> {
        id.ensure_valid("warehouseId")?;
        warehouse.validate()?;
        self.store
            .update_warehouse(id, warehouse)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("warehouse {id}")))
    }

    /// Drops the warehouse together with its ledger rows in one transaction.
    /// Past order lines keep pointing at the id and report an empty
    /// warehouse name.
    #[instrument(skip(self), err)]
    pub async fn delete_warehouse(&self, id: WarehouseId) -> DomainResult<()> {
        id.ensure_valid("warehouseId")?;
        let mut tx = self.store.begin().await?;
        if !tx.delete_warehouse(id).await? {
            return Err(DomainError::not_found(format!("warehouse {id}")));
        }
        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self, customer), err)]
    pub async fn create_customer(&self, customer: NewCustomer) -> DomainResult<Customer> {
        customer.validate()?;
        let email = customer.email.trim().to_lowercase();
        self.store.insert_customer(customer).await.map_err(|e| match e {
            StoreError::UniqueViolation(_) => {
                DomainError::conflict(format!("customer with email {email} already exists"))
            }
            other => other.into(),
        })
    }

    pub async fn customer(&self, id: CustomerId) -> DomainResult<Customer> {
        id.ensure_valid("customerId")?;
        self.store
            .get_customer(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("customer {id}")))
    }

    pub async fn customers(&self) -> DomainResult<Vec<Customer>> {
        Ok(self.store.list_customers().await?)
    }

    #[instrument(skip(self, customer), err)]
    pub async fn update_customer(
        &self,
        id: CustomerId,
        customer: NewCustomer,
    ) -> DomainResult<Customer> {
        id.ensure_valid("customerId")?;
        customer.validate()?;
        let email = customer.email.trim().to_lowercase();
        self.store
            .update_customer(id, customer)
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => {
                    DomainError::conflict(format!("customer with email {email} already exists"))
                }
                other => other.into(),
            })?
            .ok_or_else(|| DomainError::not_found(format!("customer {id}")))
    }

    #[instrument(skip(self), err)]
    pub async fn delete_customer(&self, id: CustomerId) -> DomainResult<()> {
        id.ensure_valid("customerId")?;
        if !self.store.delete_customer(id).await? {
            return Err(DomainError::not_found(format!("customer {id}")));
        }
        Ok(())
    }
}
