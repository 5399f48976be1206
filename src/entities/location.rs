use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Role of a storage location in the hierarchy.
///
/// `View` locations are organizational only and by convention never hold
/// balances; this is a policy, not a structural constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LocationKind {
    View,
    Internal,
    Customer,
    Supplier,
    Loss,
    Production,
}

/// A storage location inside a warehouse.
///
/// Locations form a tree via `parent_location_id` (an arena of records, no
/// cyclic object references). The materialized `path` is computed once at
/// creation: `parent.path + "/" + code`, root locations use
/// `/<warehouse_code>/<code>`. Path recomputation on rename/move is an
/// administrative operation outside this core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub parent_location_id: Option<Uuid>,
    /// Unique within the same parent scope.
    pub code: String,
    pub name: String,
    pub kind: LocationKind,
    pub path: String,
    pub created_at: DateTime<Utc>,
}
