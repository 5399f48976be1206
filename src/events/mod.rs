//! Domain events emitted after successful mutations.
//!
//! Events are observational: they are sent after the store commit, and a
//! failed send never rolls back or fails the operation that produced it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entities::{LotStatus, MovementType, Partition};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Event {
    WarehouseCreated {
        partition: Partition,
        warehouse_id: Uuid,
        code: String,
    },
    LocationCreated {
        partition: Partition,
        location_id: Uuid,
        path: String,
    },
    LocationDeleted {
        partition: Partition,
        location_id: Uuid,
    },
    ItemCreated {
        partition: Partition,
        item_id: Uuid,
        sku: String,
    },
    LotCreated {
        partition: Partition,
        lot_id: Uuid,
        item_id: Uuid,
        lot_number: String,
    },
    LotStatusChanged {
        partition: Partition,
        lot_id: Uuid,
        status: LotStatus,
    },
    ConversionDefined {
        partition: Partition,
        item_id: Option<Uuid>,
        from_uom: String,
        to_uom: String,
    },
    MovementCreated {
        partition: Partition,
        movement_id: Uuid,
        movement_type: MovementType,
    },
    MovementConfirmed {
        partition: Partition,
        movement_id: Uuid,
    },
    MovementPosted {
        partition: Partition,
        movement_id: Uuid,
        item_id: Uuid,
        quantity: Decimal,
    },
    MovementCancelled {
        partition: Partition,
        movement_id: Uuid,
    },
    BalanceChanged {
        partition: Partition,
        item_id: Uuid,
        warehouse_id: Uuid,
        location_id: Uuid,
        lot_id: Option<Uuid>,
        quantity: Decimal,
        reserved_quantity: Decimal,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, logging instead of failing when the receiver is gone
    /// or the channel is full. The mutation this event describes has already
    /// committed.
    pub async fn emit(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("failed to publish domain event: {}", e);
        }
    }
}

/// Consumes the event channel, logging each event. Deployments that need
/// projections or outbound notifications replace this loop with their own
/// consumer.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::MovementPosted {
                partition,
                movement_id,
                item_id,
                quantity,
            } => {
                info!(
                    %partition, %movement_id, %item_id, %quantity,
                    "movement posted"
                );
            }
            Event::BalanceChanged {
                partition,
                item_id,
                location_id,
                quantity,
                reserved_quantity,
                ..
            } => {
                debug!(
                    %partition, %item_id, %location_id, %quantity, %reserved_quantity,
                    "balance changed"
                );
            }
            other => debug!("event: {:?}", other),
        }
    }

    info!("event channel closed, stopping event processing loop");
}
