use serde::{Deserialize, Serialize};

use salesboard_core::{DomainError, Entity, Money, ProductId};

/// A catalog product.
///
/// `stock` is a legacy mirror kept for older clients. It has no authority:
/// available quantity always comes from the inventory ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Catalog list price (minor units). Orders carry their own sale price.
    pub price: Money,
    #[serde(default)]
    pub stock: i64,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub stock: i64,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::invalid_argument("product name cannot be empty"));
        }
        if self.price.is_negative() {
            return Err(DomainError::invalid_argument("product price cannot be negative"));
        }
        if self.stock < 0 {
            return Err(DomainError::invalid_argument("stock cannot be negative"));
        }
        Ok(())
    }

    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name.trim().to_string(),
            price: self.price,
            stock: self.stock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product(name: &str, price: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            price: Money::from_minor(price),
            stock: 0,
        }
    }

    #[test]
    fn rejects_blank_name_and_negative_price() {
        assert!(new_product("  ", 100).validate().is_err());
        assert!(new_product("Widget", -1).validate().is_err());
        assert!(new_product("Widget", 0).validate().is_ok());
    }

    #[test]
    fn json_uses_camel_case_and_defaults_legacy_stock() {
        let p: Product = serde_json::from_str(r#"{"id":3,"name":"Bolt","price":2.5}"#).unwrap();
        assert_eq!(p.id, ProductId::new(3));
        assert_eq!(p.stock, 0);
        assert_eq!(p.price, Money::from_minor(250));
    }
}
