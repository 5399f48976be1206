use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single-hop unit-of-measure conversion: `1 from_uom = factor * to_uom`.
///
/// `item_id = None` is the global default; an item-specific row overrides
/// it. The table is flat: no transitive chaining, so a missing pair cannot
/// be composed from intermediate units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UomConversion {
    pub id: Uuid,
    pub item_id: Option<Uuid>,
    pub from_uom: String,
    pub to_uom: String,
    pub factor: Decimal,
    pub created_at: DateTime<Utc>,
}
