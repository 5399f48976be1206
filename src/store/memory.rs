//! In-memory reference implementation of [`InventoryStore`].
//!
//! Backed by concurrent maps keyed by `(Partition, natural key)`. Write
//! batches rely on the ledger's per-balance-key locks for isolation: callers
//! hold the locks for every key in the batch while committing, so sequential
//! map writes are never observed half-applied.

use anyhow::anyhow;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::entities::{
    BalanceKey, Item, Location, Partition, StockBalance, StockLot, StockMovement, UomConversion,
    Warehouse,
};
use crate::store::{BalanceFilter, InventoryStore, MovementFilter, StoreError, StoreResult};

type ConversionKey = (Option<Uuid>, String, String);

#[derive(Default)]
pub struct MemoryStore {
    warehouses: DashMap<(Partition, Uuid), Warehouse>,
    locations: DashMap<(Partition, Uuid), Location>,
    items: DashMap<(Partition, Uuid), Item>,
    lots: DashMap<(Partition, Uuid), StockLot>,
    // Uniqueness index for (item_id, lot_number); shard lock makes
    // insert_lot_if_absent atomic.
    lot_numbers: DashMap<(Partition, Uuid, String), Uuid>,
    balances: DashMap<(Partition, BalanceKey), StockBalance>,
    movements: DashMap<(Partition, Uuid), StockMovement>,
    conversions: DashMap<(Partition, ConversionKey), UomConversion>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn get_warehouse(&self, part: &Partition, id: Uuid) -> StoreResult<Option<Warehouse>> {
        Ok(self
            .warehouses
            .get(&(part.clone(), id))
            .map(|e| e.value().clone()))
    }

    async fn find_warehouse_by_code(
        &self,
        part: &Partition,
        code: &str,
    ) -> StoreResult<Option<Warehouse>> {
        Ok(self
            .warehouses
            .iter()
            .find(|e| e.key().0 == *part && e.value().code == code)
            .map(|e| e.value().clone()))
    }

    async fn insert_warehouse(&self, part: &Partition, warehouse: Warehouse) -> StoreResult<()> {
        self.warehouses
            .insert((part.clone(), warehouse.id), warehouse);
        Ok(())
    }

    async fn list_warehouses(&self, part: &Partition) -> StoreResult<Vec<Warehouse>> {
        let mut out: Vec<Warehouse> = self
            .warehouses
            .iter()
            .filter(|e| e.key().0 == *part)
            .map(|e| e.value().clone())
            .collect();
        out.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(out)
    }

    async fn get_location(&self, part: &Partition, id: Uuid) -> StoreResult<Option<Location>> {
        Ok(self
            .locations
            .get(&(part.clone(), id))
            .map(|e| e.value().clone()))
    }

    async fn find_location_by_code(
        &self,
        part: &Partition,
        warehouse_id: Uuid,
        parent_location_id: Option<Uuid>,
        code: &str,
    ) -> StoreResult<Option<Location>> {
        Ok(self
            .locations
            .iter()
            .find(|e| {
                let loc = e.value();
                e.key().0 == *part
                    && loc.warehouse_id == warehouse_id
                    && loc.parent_location_id == parent_location_id
                    && loc.code == code
            })
            .map(|e| e.value().clone()))
    }

    async fn insert_location(&self, part: &Partition, location: Location) -> StoreResult<()> {
        self.locations.insert((part.clone(), location.id), location);
        Ok(())
    }

    async fn delete_location(&self, part: &Partition, id: Uuid) -> StoreResult<()> {
        self.locations.remove(&(part.clone(), id));
        Ok(())
    }

    async fn location_has_children(&self, part: &Partition, id: Uuid) -> StoreResult<bool> {
        Ok(self
            .locations
            .iter()
            .any(|e| e.key().0 == *part && e.value().parent_location_id == Some(id)))
    }

    async fn list_locations_by_warehouse(
        &self,
        part: &Partition,
        warehouse_id: Uuid,
    ) -> StoreResult<Vec<Location>> {
        let mut out: Vec<Location> = self
            .locations
            .iter()
            .filter(|e| e.key().0 == *part && e.value().warehouse_id == warehouse_id)
            .map(|e| e.value().clone())
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    async fn get_item(&self, part: &Partition, id: Uuid) -> StoreResult<Option<Item>> {
        Ok(self
            .items
            .get(&(part.clone(), id))
            .map(|e| e.value().clone()))
    }

    async fn find_item_by_sku(&self, part: &Partition, sku: &str) -> StoreResult<Option<Item>> {
        Ok(self
            .items
            .iter()
            .find(|e| e.key().0 == *part && e.value().sku == sku)
            .map(|e| e.value().clone()))
    }

    async fn insert_item(&self, part: &Partition, item: Item) -> StoreResult<()> {
        self.items.insert((part.clone(), item.id), item);
        Ok(())
    }

    async fn get_lot(&self, part: &Partition, id: Uuid) -> StoreResult<Option<StockLot>> {
        Ok(self
            .lots
            .get(&(part.clone(), id))
            .map(|e| e.value().clone()))
    }

    async fn find_lot_by_number(
        &self,
        part: &Partition,
        item_id: Uuid,
        lot_number: &str,
    ) -> StoreResult<Option<StockLot>> {
        let id = self
            .lot_numbers
            .get(&(part.clone(), item_id, lot_number.to_string()))
            .map(|e| *e.value());
        match id {
            Some(id) => Ok(self
                .lots
                .get(&(part.clone(), id))
                .map(|e| e.value().clone())),
            None => Ok(None),
        }
    }

    async fn insert_lot_if_absent(
        &self,
        part: &Partition,
        lot: StockLot,
    ) -> StoreResult<StockLot> {
        match self
            .lot_numbers
            .entry((part.clone(), lot.item_id, lot.lot_number.clone()))
        {
            Entry::Occupied(existing) => {
                let id = *existing.get();
                drop(existing);
                self.lots
                    .get(&(part.clone(), id))
                    .map(|e| e.value().clone())
                    .ok_or_else(|| {
                        StoreError::new(
                            "insert_lot_if_absent",
                            format!("lot {}", id),
                            anyhow!("lot index points at a missing row"),
                        )
                    })
            }
            Entry::Vacant(slot) => {
                // The vacant entry's shard lock is held until `index` drops,
                // so the row is stored before any racing insert can read it.
                let index = slot.insert(lot.id);
                self.lots.insert((part.clone(), lot.id), lot.clone());
                drop(index);
                Ok(lot)
            }
        }
    }

    async fn update_lot(&self, part: &Partition, lot: StockLot) -> StoreResult<()> {
        self.lots.insert((part.clone(), lot.id), lot);
        Ok(())
    }

    async fn get_balance(
        &self,
        part: &Partition,
        key: &BalanceKey,
    ) -> StoreResult<Option<StockBalance>> {
        Ok(self
            .balances
            .get(&(part.clone(), key.clone()))
            .map(|e| e.value().clone()))
    }

    async fn upsert_balances(
        &self,
        part: &Partition,
        balances: Vec<StockBalance>,
    ) -> StoreResult<()> {
        for bal in balances {
            self.balances.insert((part.clone(), bal.key()), bal);
        }
        Ok(())
    }

    async fn list_balances(
        &self,
        part: &Partition,
        filter: &BalanceFilter,
    ) -> StoreResult<Vec<StockBalance>> {
        let mut out: Vec<StockBalance> = self
            .balances
            .iter()
            .filter(|e| {
                let bal = e.value();
                e.key().0 == *part
                    && filter.item_id.map_or(true, |v| bal.item_id == v)
                    && filter.warehouse_id.map_or(true, |v| bal.warehouse_id == v)
                    && filter.location_id.map_or(true, |v| bal.location_id == v)
                    && filter.lot_id.map_or(true, |v| bal.lot_id == Some(v))
            })
            .map(|e| e.value().clone())
            .collect();
        out.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(out)
    }

    async fn get_movement(
        &self,
        part: &Partition,
        id: Uuid,
    ) -> StoreResult<Option<StockMovement>> {
        Ok(self
            .movements
            .get(&(part.clone(), id))
            .map(|e| e.value().clone()))
    }

    async fn insert_movement(&self, part: &Partition, movement: StockMovement) -> StoreResult<()> {
        self.movements.insert((part.clone(), movement.id), movement);
        Ok(())
    }

    async fn update_movement(&self, part: &Partition, movement: StockMovement) -> StoreResult<()> {
        self.movements.insert((part.clone(), movement.id), movement);
        Ok(())
    }

    async fn list_movements(
        &self,
        part: &Partition,
        filter: &MovementFilter,
    ) -> StoreResult<Vec<StockMovement>> {
        let mut out: Vec<StockMovement> = self
            .movements
            .iter()
            .filter(|e| {
                let mv = e.value();
                let in_warehouse = filter.warehouse_id.map_or(true, |v| {
                    mv.from.map_or(false, |l| l.warehouse_id == v)
                        || mv.to.map_or(false, |l| l.warehouse_id == v)
                });
                e.key().0 == *part
                    && filter.item_id.map_or(true, |v| mv.item_id == v)
                    && filter.movement_type.map_or(true, |v| mv.movement_type == v)
                    && filter.status.map_or(true, |v| mv.status == v)
                    && in_warehouse
            })
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|m| m.created_at);
        Ok(out)
    }

    async fn commit_movement(
        &self,
        part: &Partition,
        movement: StockMovement,
        balances: Vec<StockBalance>,
    ) -> StoreResult<()> {
        // Caller holds the per-key locks for every balance in the batch.
        for bal in balances {
            self.balances.insert((part.clone(), bal.key()), bal);
        }
        self.movements.insert((part.clone(), movement.id), movement);
        Ok(())
    }

    async fn find_conversion(
        &self,
        part: &Partition,
        item_id: Option<Uuid>,
        from_uom: &str,
        to_uom: &str,
    ) -> StoreResult<Option<UomConversion>> {
        let key = (
            part.clone(),
            (item_id, from_uom.to_string(), to_uom.to_string()),
        );
        Ok(self.conversions.get(&key).map(|e| e.value().clone()))
    }

    async fn insert_conversion(
        &self,
        part: &Partition,
        conversion: UomConversion,
    ) -> StoreResult<()> {
        let key = (
            part.clone(),
            (
                conversion.item_id,
                conversion.from_uom.clone(),
                conversion.to_uom.clone(),
            ),
        );
        self.conversions.insert(key, conversion);
        Ok(())
    }
}
