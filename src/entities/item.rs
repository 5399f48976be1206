use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// How units of an item are identified through the warehouse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrackingPolicy {
    /// No lot identity; balances are keyed without a lot.
    None,
    /// Batch tracking: every movement carries a lot.
    Batch,
    /// Serial tracking: one unit per lot by convention.
    Serial,
}

impl TrackingPolicy {
    pub fn requires_lot(&self) -> bool {
        !matches!(self, TrackingPolicy::None)
    }
}

/// Item master record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    /// Unique per partition.
    pub sku: String,
    pub name: String,
    pub item_type: String,
    /// Unit balances are stored in; movements in other units are normalized
    /// to this at post time.
    pub base_uom: String,
    pub tracking: TrackingPolicy,
    pub min_stock: Option<Decimal>,
    pub max_stock: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}
