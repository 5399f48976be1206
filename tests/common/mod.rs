#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;

use stockcore::entities::{
    BalanceKey, Item, Location, LocationKind, MovementLeg, MovementType, StockMovement,
    TrackingPolicy, Warehouse,
};
use stockcore::events::{process_events, EventSender};
use stockcore::services::{NewItem, NewLocation, NewMovement, NewWarehouse};
use stockcore::store::MemoryStore;
use stockcore::{AppConfig, InventoryServices, Partition};

pub fn partition() -> Partition {
    Partition::new("acme", "prod")
}

/// Fresh services over an empty in-memory store, with a live event consumer.
pub fn setup() -> InventoryServices {
    let store = Arc::new(MemoryStore::new());
    let config = AppConfig::default();
    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(process_events(rx));
    InventoryServices::new(store, &config, EventSender::new(tx))
}

pub async fn seed_warehouse(svc: &InventoryServices, part: &Partition, code: &str) -> Warehouse {
    svc.warehouses
        .create_warehouse(
            part,
            NewWarehouse {
                code: code.to_string(),
                name: format!("{} warehouse", code),
                address: None,
            },
        )
        .await
        .expect("seed warehouse")
}

pub async fn seed_location(
    svc: &InventoryServices,
    part: &Partition,
    warehouse: &Warehouse,
    parent: Option<&Location>,
    code: &str,
) -> Location {
    svc.locations
        .create_location(
            part,
            NewLocation {
                warehouse_id: warehouse.id,
                parent_location_id: parent.map(|p| p.id),
                code: code.to_string(),
                name: code.to_string(),
                kind: LocationKind::Internal,
            },
        )
        .await
        .expect("seed location")
}

pub async fn seed_item(
    svc: &InventoryServices,
    part: &Partition,
    sku: &str,
    base_uom: &str,
    tracking: TrackingPolicy,
) -> Item {
    svc.items
        .create_item(
            part,
            NewItem {
                sku: sku.to_string(),
                name: sku.to_string(),
                item_type: "raw_material".to_string(),
                base_uom: base_uom.to_string(),
                tracking,
                min_stock: None,
                max_stock: None,
            },
        )
        .await
        .expect("seed item")
}

pub fn leg(location: &Location) -> MovementLeg {
    MovementLeg {
        warehouse_id: location.warehouse_id,
        location_id: location.id,
    }
}

pub fn key_of(item: &Item, location: &Location, lot_id: Option<Uuid>) -> BalanceKey {
    BalanceKey {
        item_id: item.id,
        warehouse_id: location.warehouse_id,
        location_id: location.id,
        lot_id,
    }
}

pub fn movement_input(
    movement_type: MovementType,
    item: &Item,
    from: Option<&Location>,
    to: Option<&Location>,
    quantity: Decimal,
    uom: &str,
    lot_id: Option<Uuid>,
) -> NewMovement {
    NewMovement {
        movement_type,
        reference: None,
        item_id: item.id,
        lot_id,
        from: from.map(leg),
        to: to.map(leg),
        quantity,
        uom: uom.to_string(),
        moved_at: None,
    }
}

/// Creates, confirms and posts a receipt into `to`.
pub async fn post_receipt(
    svc: &InventoryServices,
    part: &Partition,
    item: &Item,
    to: &Location,
    quantity: Decimal,
    lot_id: Option<Uuid>,
) -> StockMovement {
    let mv = svc
        .movements
        .create_movement(
            part,
            movement_input(
                MovementType::Receipt,
                item,
                None,
                Some(to),
                quantity,
                &item.base_uom,
                lot_id,
            ),
        )
        .await
        .expect("create receipt");
    svc.movements
        .confirm_movement(part, mv.id)
        .await
        .expect("confirm receipt");
    svc.movements
        .post_movement(part, mv.id)
        .await
        .expect("post receipt")
}
