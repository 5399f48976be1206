//! Domain entities for the inventory core.
//!
//! Plain data types; all persistence goes through [`crate::store`]. Every
//! entity is implicitly scoped by a [`Partition`] in addition to its natural
//! key; the partition is carried as an explicit parameter on every store
//! and service call, never as ambient state.

use serde::{Deserialize, Serialize};

pub mod item;
pub mod location;
pub mod stock_balance;
pub mod stock_lot;
pub mod stock_movement;
pub mod uom_conversion;
pub mod warehouse;

pub use item::{Item, TrackingPolicy};
pub use location::{Location, LocationKind};
pub use stock_balance::{BalanceKey, StockBalance};
pub use stock_lot::{LotStatus, StockLot};
pub use stock_movement::{LegShape, MovementLeg, MovementStatus, MovementType, StockMovement};
pub use uom_conversion::UomConversion;
pub use warehouse::Warehouse;

/// Tenant/stage pair scoping every read and write.
///
/// All uniqueness constraints (SKU, location code, lot number, warehouse
/// code) are evaluated per partition, not globally.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    pub tenant: String,
    pub stage: String,
}

impl Partition {
    pub fn new(tenant: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            stage: stage.into(),
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.tenant, self.stage)
    }
}
