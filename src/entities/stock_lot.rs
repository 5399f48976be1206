use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LotStatus {
    Active,
    OnHold,
    Rejected,
    Expired,
}

impl LotStatus {
    /// Whether new inbound movements may target a lot in this status.
    pub fn receivable(&self) -> bool {
        !matches!(self, LotStatus::Rejected | LotStatus::Expired)
    }
}

/// Batch or serial identity for a tracked item.
///
/// Lot numbers are unique per item (within a partition). For serial-tracked
/// items each lot represents exactly one unit by convention. Expiry is
/// informational here: no automatic status flip on date passage, that is an
/// external scheduled concern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockLot {
    pub id: Uuid,
    pub item_id: Uuid,
    pub lot_number: String,
    pub manufacture_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub status: LotStatus,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
