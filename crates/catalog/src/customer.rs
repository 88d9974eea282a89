use serde::{Deserialize, Serialize};

use salesboard_core::{CustomerId, DomainError, Entity};

/// A customer record. `email` is unique across customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> CustomerId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

impl NewCustomer {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::invalid_argument("customer name cannot be empty"));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::invalid_argument("a valid email is required"));
        }
        Ok(())
    }

    pub fn into_customer(self, id: CustomerId) -> Customer {
        Customer {
            id,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone,
            address: self.address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        let c = NewCustomer {
            name: "Ada".into(),
            email: " Ada@Example.COM ".into(),
            phone: String::new(),
            address: String::new(),
        };
        c.validate().unwrap();
        assert_eq!(c.into_customer(CustomerId::new(1)).email, "ada@example.com");
    }

    #[test]
    fn email_without_at_sign_is_rejected() {
        let c = NewCustomer {
            name: "Ada".into(),
            email: "nope".into(),
            phone: String::new(),
            address: String::new(),
        };
        assert!(c.validate().is_err());
    }
}
