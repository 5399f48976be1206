//! Service layer: one service per subsystem, wired by [`InventoryServices`].
//!
//! Services are cheap to clone and hold `Arc`s to their collaborators. Every
//! operation takes the [`Partition`](crate::entities::Partition) explicitly.

use std::sync::Arc;

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::store::InventoryStore;

pub mod balances;
pub mod items;
pub mod locations;
pub mod lots;
pub mod movements;
pub mod uom;
pub mod warehouses;

pub use balances::{BalanceDelta, BalanceService};
pub use items::{ItemService, NewItem};
pub use locations::{LocationService, NewLocation};
pub use lots::{LotAttributes, LotService};
pub use movements::{MovementService, NewMovement};
pub use uom::{NewConversion, UomService};
pub use warehouses::{NewWarehouse, WarehouseService};

/// All services over one store, sharing one event channel.
#[derive(Clone)]
pub struct InventoryServices {
    pub warehouses: WarehouseService,
    pub locations: LocationService,
    pub items: ItemService,
    pub lots: LotService,
    pub uom: UomService,
    pub balances: BalanceService,
    pub movements: MovementService,
}

impl InventoryServices {
    pub fn new(store: Arc<dyn InventoryStore>, config: &AppConfig, events: EventSender) -> Self {
        let balances = BalanceService::new(store.clone(), config, events.clone());
        let uom = UomService::new(store.clone(), events.clone());
        let movements = MovementService::new(
            store.clone(),
            balances.clone(),
            uom.clone(),
            config,
            events.clone(),
        );
        Self {
            warehouses: WarehouseService::new(store.clone(), events.clone()),
            locations: LocationService::new(store.clone(), events.clone()),
            items: ItemService::new(store.clone(), events.clone()),
            lots: LotService::new(store, events),
            uom,
            balances,
            movements,
        }
    }
}

/// Codes participate in materialized paths, so the separator is reserved.
pub(crate) fn validate_code(code: &str) -> Result<(), ValidationError> {
    if code.trim().is_empty() {
        return Err(ValidationError::new("code_empty"));
    }
    if code.contains('/') || code.contains(char::is_whitespace) {
        return Err(ValidationError::new("code_invalid_chars"));
    }
    Ok(())
}

pub(crate) fn validate_positive_quantity(quantity: &Decimal) -> Result<(), ValidationError> {
    if *quantity <= Decimal::ZERO {
        return Err(ValidationError::new("quantity_not_positive"));
    }
    Ok(())
}
