use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{Partition, Warehouse};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::store::InventoryStore;

use super::validate_code;

#[derive(Debug, Clone, Validate)]
pub struct NewWarehouse {
    #[validate(custom = "validate_code")]
    pub code: String,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub address: Option<String>,
}

#[derive(Clone)]
pub struct WarehouseService {
    store: Arc<dyn InventoryStore>,
    events: EventSender,
}

impl WarehouseService {
    pub fn new(store: Arc<dyn InventoryStore>, events: EventSender) -> Self {
        Self { store, events }
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_warehouse(
        &self,
        part: &Partition,
        input: NewWarehouse,
    ) -> ServiceResult<Warehouse> {
        input.validate()?;

        if self
            .store
            .find_warehouse_by_code(part, &input.code)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict(format!(
                "warehouse code '{}' already exists",
                input.code
            )));
        }

        let warehouse = Warehouse {
            id: Uuid::new_v4(),
            code: input.code,
            name: input.name,
            address: input.address,
            active: true,
            created_at: Utc::now(),
        };
        self.store.insert_warehouse(part, warehouse.clone()).await?;

        info!(warehouse_id = %warehouse.id, "warehouse created");
        self.events
            .emit(Event::WarehouseCreated {
                partition: part.clone(),
                warehouse_id: warehouse.id,
                code: warehouse.code.clone(),
            })
            .await;

        Ok(warehouse)
    }

    pub async fn get_warehouse(&self, part: &Partition, id: Uuid) -> ServiceResult<Warehouse> {
        self.store
            .get_warehouse(part, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("warehouse {}", id)))
    }

    pub async fn list_warehouses(&self, part: &Partition) -> ServiceResult<Vec<Warehouse>> {
        Ok(self.store.list_warehouses(part).await?)
    }
}
