//! Persistence seam for the inventory core.
//!
//! The core consumes one transactional, partition-scoped store abstraction:
//! typed get/upsert/list per entity plus atomic multi-row write batches for
//! balance commits. [`memory::MemoryStore`] is the in-process reference
//! implementation; real deployments bind this trait to their database.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{
    BalanceKey, Item, Location, MovementStatus, MovementType, Partition, StockBalance, StockLot,
    StockMovement, UomConversion, Warehouse,
};

pub mod memory;

pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Infrastructure failure from the underlying store, wrapped with the
/// operation and key it failed on.
#[derive(Debug, Error)]
#[error("store operation '{op}' failed for [{key}]: {source}")]
pub struct StoreError {
    pub op: &'static str,
    pub key: String,
    #[source]
    pub source: anyhow::Error,
}

impl StoreError {
    pub fn new(op: &'static str, key: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self {
            op,
            key: key.into(),
            source: source.into(),
        }
    }
}

/// Filters for balance listings. Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct BalanceFilter {
    pub item_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub lot_id: Option<Uuid>,
}

/// Filters for movement listings.
#[derive(Clone, Debug, Default)]
pub struct MovementFilter {
    pub item_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub status: Option<MovementStatus>,
    pub warehouse_id: Option<Uuid>,
}

/// Transactional, partition-scoped persistence contract.
///
/// Every method takes the [`Partition`] explicitly; implementations must
/// evaluate all lookups and uniqueness checks within that partition.
/// Write-batch methods (`upsert_balances`, `commit_movement`) must be atomic:
/// either every row lands or none does.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    // Warehouses
    async fn get_warehouse(&self, part: &Partition, id: Uuid) -> StoreResult<Option<Warehouse>>;
    async fn find_warehouse_by_code(
        &self,
        part: &Partition,
        code: &str,
    ) -> StoreResult<Option<Warehouse>>;
    async fn insert_warehouse(&self, part: &Partition, warehouse: Warehouse) -> StoreResult<()>;
    async fn list_warehouses(&self, part: &Partition) -> StoreResult<Vec<Warehouse>>;

    // Locations
    async fn get_location(&self, part: &Partition, id: Uuid) -> StoreResult<Option<Location>>;
    async fn find_location_by_code(
        &self,
        part: &Partition,
        warehouse_id: Uuid,
        parent_location_id: Option<Uuid>,
        code: &str,
    ) -> StoreResult<Option<Location>>;
    async fn insert_location(&self, part: &Partition, location: Location) -> StoreResult<()>;
    async fn delete_location(&self, part: &Partition, id: Uuid) -> StoreResult<()>;
    async fn location_has_children(&self, part: &Partition, id: Uuid) -> StoreResult<bool>;
    async fn list_locations_by_warehouse(
        &self,
        part: &Partition,
        warehouse_id: Uuid,
    ) -> StoreResult<Vec<Location>>;

    // Items
    async fn get_item(&self, part: &Partition, id: Uuid) -> StoreResult<Option<Item>>;
    async fn find_item_by_sku(&self, part: &Partition, sku: &str) -> StoreResult<Option<Item>>;
    async fn insert_item(&self, part: &Partition, item: Item) -> StoreResult<()>;

    // Lots
    async fn get_lot(&self, part: &Partition, id: Uuid) -> StoreResult<Option<StockLot>>;
    async fn find_lot_by_number(
        &self,
        part: &Partition,
        item_id: Uuid,
        lot_number: &str,
    ) -> StoreResult<Option<StockLot>>;
    /// Inserts the lot unless one with the same `(item_id, lot_number)`
    /// already exists in the partition; returns the stored row either way.
    /// This is the uniqueness guard, so it must be atomic with respect to
    /// concurrent inserts of the same pair.
    async fn insert_lot_if_absent(
        &self,
        part: &Partition,
        lot: StockLot,
    ) -> StoreResult<StockLot>;
    async fn update_lot(&self, part: &Partition, lot: StockLot) -> StoreResult<()>;

    // Balances
    async fn get_balance(
        &self,
        part: &Partition,
        key: &BalanceKey,
    ) -> StoreResult<Option<StockBalance>>;
    /// Atomic multi-row upsert.
    async fn upsert_balances(
        &self,
        part: &Partition,
        balances: Vec<StockBalance>,
    ) -> StoreResult<()>;
    async fn list_balances(
        &self,
        part: &Partition,
        filter: &BalanceFilter,
    ) -> StoreResult<Vec<StockBalance>>;

    // Movements
    async fn get_movement(&self, part: &Partition, id: Uuid)
        -> StoreResult<Option<StockMovement>>;
    async fn insert_movement(&self, part: &Partition, movement: StockMovement) -> StoreResult<()>;
    async fn update_movement(&self, part: &Partition, movement: StockMovement) -> StoreResult<()>;
    async fn list_movements(
        &self,
        part: &Partition,
        filter: &MovementFilter,
    ) -> StoreResult<Vec<StockMovement>>;

    /// Commits a posted movement and its balance rows as one transaction.
    async fn commit_movement(
        &self,
        part: &Partition,
        movement: StockMovement,
        balances: Vec<StockBalance>,
    ) -> StoreResult<()>;

    // UOM conversions
    async fn find_conversion(
        &self,
        part: &Partition,
        item_id: Option<Uuid>,
        from_uom: &str,
        to_uom: &str,
    ) -> StoreResult<Option<UomConversion>>;
    async fn insert_conversion(
        &self,
        part: &Partition,
        conversion: UomConversion,
    ) -> StoreResult<()>;
}
