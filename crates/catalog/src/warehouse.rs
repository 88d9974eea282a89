use serde::{Deserialize, Serialize};

use salesboard_core::{DomainError, Entity, WarehouseId};

/// A stored warehouse record.
///
/// The number of distinct products a warehouse holds is deliberately absent:
/// it is derived from ledger rows at read time (see `salesboard-inventory`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    pub capacity: i64,
}

impl Entity for Warehouse {
    type Id = WarehouseId;

    fn id(&self) -> WarehouseId {
        self.id
    }
}

/// Input for creating a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWarehouse {
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    #[serde(default)]
    pub capacity: i64,
}

impl NewWarehouse {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty()
            || self.latitude.trim().is_empty()
            || self.longitude.trim().is_empty()
        {
            return Err(DomainError::invalid_argument(
                "name, latitude, longitude are required",
            ));
        }
        if self.capacity < 0 {
            return Err(DomainError::invalid_argument("capacity cannot be negative"));
        }
        Ok(())
    }

    pub fn into_warehouse(self, id: WarehouseId) -> Warehouse {
        Warehouse {
            id,
            name: self.name.trim().to_string(),
            latitude: self.latitude.trim().to_string(),
            longitude: self.longitude.trim().to_string(),
            capacity: self.capacity,
        }
    }
}
