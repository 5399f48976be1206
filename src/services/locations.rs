use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{Location, LocationKind, Partition};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::store::InventoryStore;

use super::validate_code;

#[derive(Debug, Clone, Validate)]
pub struct NewLocation {
    pub warehouse_id: Uuid,
    pub parent_location_id: Option<Uuid>,
    #[validate(custom = "validate_code")]
    pub code: String,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    pub kind: LocationKind,
}

/// Location hierarchy: warehouses and the tree of storage locations inside
/// them. The tree is an arena of records linked by `parent_location_id`;
/// hierarchy is reconstructed from the stored paths on demand, no in-process
/// tree cache.
#[derive(Clone)]
pub struct LocationService {
    store: Arc<dyn InventoryStore>,
    events: EventSender,
}

impl LocationService {
    pub fn new(store: Arc<dyn InventoryStore>, events: EventSender) -> Self {
        Self { store, events }
    }

    /// Creates a location under an optional parent and materializes its
    /// path. The parent must belong to the same warehouse, and the code must
    /// be unused within the same parent scope.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_location(
        &self,
        part: &Partition,
        input: NewLocation,
    ) -> ServiceResult<Location> {
        input.validate()?;

        let warehouse = self
            .store
            .get_warehouse(part, input.warehouse_id)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!("warehouse {}", input.warehouse_id))
            })?;

        let parent_path = match input.parent_location_id {
            Some(parent_id) => {
                let parent = self
                    .store
                    .get_location(part, parent_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::not_found(format!("parent location {}", parent_id))
                    })?;
                if parent.warehouse_id != input.warehouse_id {
                    return Err(ServiceError::validation(format!(
                        "parent location '{}' belongs to a different warehouse",
                        parent.code
                    )));
                }
                parent.path
            }
            None => format!("/{}", warehouse.code),
        };

        if self
            .store
            .find_location_by_code(part, input.warehouse_id, input.parent_location_id, &input.code)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict(format!(
                "location code '{}' already exists under the same parent",
                input.code
            )));
        }

        let location = Location {
            id: Uuid::new_v4(),
            warehouse_id: input.warehouse_id,
            parent_location_id: input.parent_location_id,
            path: format!("{}/{}", parent_path, input.code),
            code: input.code,
            name: input.name,
            kind: input.kind,
            created_at: Utc::now(),
        };
        self.store.insert_location(part, location.clone()).await?;

        info!(location_id = %location.id, path = %location.path, "location created");
        self.events
            .emit(Event::LocationCreated {
                partition: part.clone(),
                location_id: location.id,
                path: location.path.clone(),
            })
            .await;

        Ok(location)
    }

    /// Deletes a location. Fails while any location still points at it as a
    /// parent.
    #[instrument(skip(self))]
    pub async fn delete_location(&self, part: &Partition, id: Uuid) -> ServiceResult<()> {
        let location = self
            .store
            .get_location(part, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("location {}", id)))?;

        if self.store.location_has_children(part, id).await? {
            return Err(ServiceError::business_rule(format!(
                "location '{}' has child locations and cannot be deleted",
                location.code
            )));
        }

        self.store.delete_location(part, id).await?;

        info!(location_id = %id, "location deleted");
        self.events
            .emit(Event::LocationDeleted {
                partition: part.clone(),
                location_id: id,
            })
            .await;

        Ok(())
    }

    pub async fn get_location(&self, part: &Partition, id: Uuid) -> ServiceResult<Location> {
        self.store
            .get_location(part, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("location {}", id)))
    }

    /// All locations of a warehouse, ordered by path so callers can rebuild
    /// the tree without recursive traversal.
    pub async fn list_by_warehouse(
        &self,
        part: &Partition,
        warehouse_id: Uuid,
    ) -> ServiceResult<Vec<Location>> {
        Ok(self
            .store
            .list_locations_by_warehouse(part, warehouse_id)
            .await?)
    }
}
