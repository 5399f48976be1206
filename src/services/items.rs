use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{Item, Partition, TrackingPolicy};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::store::InventoryStore;

#[derive(Debug, Clone, Validate)]
pub struct NewItem {
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub item_type: String,
    #[validate(length(min = 1, max = 16))]
    pub base_uom: String,
    pub tracking: TrackingPolicy,
    pub min_stock: Option<Decimal>,
    pub max_stock: Option<Decimal>,
}

/// Item master administration. Items participate in balances and movements
/// and own lots when tracked.
#[derive(Clone)]
pub struct ItemService {
    store: Arc<dyn InventoryStore>,
    events: EventSender,
}

impl ItemService {
    pub fn new(store: Arc<dyn InventoryStore>, events: EventSender) -> Self {
        Self { store, events }
    }

    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_item(&self, part: &Partition, input: NewItem) -> ServiceResult<Item> {
        input.validate()?;

        if let (Some(min), Some(max)) = (input.min_stock, input.max_stock) {
            if min > max {
                return Err(ServiceError::validation(
                    "min_stock cannot exceed max_stock",
                ));
            }
        }

        if self
            .store
            .find_item_by_sku(part, &input.sku)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict(format!(
                "sku '{}' already exists",
                input.sku
            )));
        }

        let item = Item {
            id: Uuid::new_v4(),
            sku: input.sku,
            name: input.name,
            item_type: input.item_type,
            base_uom: input.base_uom,
            tracking: input.tracking,
            min_stock: input.min_stock,
            max_stock: input.max_stock,
            created_at: Utc::now(),
        };
        self.store.insert_item(part, item.clone()).await?;

        info!(item_id = %item.id, "item created");
        self.events
            .emit(Event::ItemCreated {
                partition: part.clone(),
                item_id: item.id,
                sku: item.sku.clone(),
            })
            .await;

        Ok(item)
    }

    pub async fn get_item(&self, part: &Partition, id: Uuid) -> ServiceResult<Item> {
        self.store
            .get_item(part, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("item {}", id)))
    }
}
