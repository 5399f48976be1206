use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MovementType {
    Receipt,
    Delivery,
    Internal,
    Adjustment,
    Production,
}

impl MovementType {
    /// Legs a movement of this type must carry.
    /// Receipt is inbound-only, delivery outbound-only, internal transfers
    /// need both; adjustment and production accept either direction.
    pub fn leg_shape(&self) -> LegShape {
        match self {
            MovementType::Receipt => LegShape::InboundOnly,
            MovementType::Delivery => LegShape::OutboundOnly,
            MovementType::Internal => LegShape::Both,
            MovementType::Adjustment | MovementType::Production => LegShape::AtLeastOne,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegShape {
    InboundOnly,
    OutboundOnly,
    Both,
    AtLeastOne,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MovementStatus {
    Draft,
    Confirmed,
    Done,
    Cancelled,
}

/// One side of a movement: a location within a warehouse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementLeg {
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
}

/// A directional, append-only transfer record.
///
/// Movements are the sole writers of stock balances. Lifecycle:
/// `draft -> confirmed -> done`, or `draft/confirmed -> cancelled`; no
/// transition out of `done` or `cancelled`, and a `done` movement is
/// immutable. Reversal of a posted movement is not provided; the recourse
/// is an equal-and-opposite adjustment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub movement_type: MovementType,
    pub reference: Option<String>,
    pub item_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub from: Option<MovementLeg>,
    pub to: Option<MovementLeg>,
    pub quantity: Decimal,
    pub uom: String,
    pub status: MovementStatus,
    pub moved_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
}

impl StockMovement {
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, MovementStatus::Done | MovementStatus::Cancelled)
    }
}
