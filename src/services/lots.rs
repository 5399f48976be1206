use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{LotStatus, Partition, StockLot};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::store::InventoryStore;

/// Optional attributes for a new lot. Ignored when the lot already exists.
#[derive(Debug, Clone, Default)]
pub struct LotAttributes {
    pub manufacture_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub metadata: Option<serde_json::Value>,
}

/// Lot identity and lifecycle for batch- and serial-tracked items.
#[derive(Clone)]
pub struct LotService {
    store: Arc<dyn InventoryStore>,
    events: EventSender,
}

impl LotService {
    pub fn new(store: Arc<dyn InventoryStore>, events: EventSender) -> Self {
        Self { store, events }
    }

    /// Looks up the lot by (item, lot_number) and creates it when absent.
    /// Idempotent: repeated calls return the same lot id, and attributes are
    /// only applied on first creation.
    #[instrument(skip(self, attrs))]
    pub async fn find_or_create_lot(
        &self,
        part: &Partition,
        item_id: Uuid,
        lot_number: &str,
        attrs: LotAttributes,
    ) -> ServiceResult<StockLot> {
        if lot_number.trim().is_empty() {
            return Err(ServiceError::validation("lot_number cannot be empty"));
        }

        let item = self
            .store
            .get_item(part, item_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("item {}", item_id)))?;

        if let Some(existing) = self
            .store
            .find_lot_by_number(part, item.id, lot_number)
            .await?
        {
            return Ok(existing);
        }

        let candidate = StockLot {
            id: Uuid::new_v4(),
            item_id: item.id,
            lot_number: lot_number.to_string(),
            manufacture_date: attrs.manufacture_date,
            expiry_date: attrs.expiry_date,
            status: LotStatus::Active,
            metadata: attrs.metadata,
            created_at: Utc::now(),
        };
        // Conditional insert carries the uniqueness guarantee: a racing call
        // with the same (item, lot_number) gets the row that won.
        let lot = self
            .store
            .insert_lot_if_absent(part, candidate.clone())
            .await?;

        if lot.id == candidate.id {
            info!(lot_id = %lot.id, lot_number = %lot.lot_number, "lot created");
            self.events
                .emit(Event::LotCreated {
                    partition: part.clone(),
                    lot_id: lot.id,
                    item_id: lot.item_id,
                    lot_number: lot.lot_number.clone(),
                })
                .await;
        }

        Ok(lot)
    }

    /// Free transition between lot statuses. Movement posting enforces the
    /// inbound restriction against rejected/expired lots; nothing here does.
    #[instrument(skip(self))]
    pub async fn set_lot_status(
        &self,
        part: &Partition,
        lot_id: Uuid,
        status: LotStatus,
    ) -> ServiceResult<StockLot> {
        let mut lot = self
            .store
            .get_lot(part, lot_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("lot {}", lot_id)))?;

        lot.status = status;
        self.store.update_lot(part, lot.clone()).await?;

        info!(lot_id = %lot.id, status = %status, "lot status changed");
        self.events
            .emit(Event::LotStatusChanged {
                partition: part.clone(),
                lot_id: lot.id,
                status,
            })
            .await;

        Ok(lot)
    }

    pub async fn get_lot(&self, part: &Partition, id: Uuid) -> ServiceResult<StockLot> {
        self.store
            .get_lot(part, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("lot {}", id)))
    }
}
