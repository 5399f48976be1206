use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::entities::{
    BalanceKey, Item, LegShape, MovementLeg, MovementStatus, MovementType, Partition,
    StockMovement,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::store::{InventoryStore, MovementFilter};

use super::balances::{BalanceDelta, BalanceService};
use super::uom::UomService;
use super::validate_positive_quantity;

#[derive(Debug, Clone, Validate)]
pub struct NewMovement {
    pub movement_type: MovementType,
    #[validate(length(max = 64))]
    pub reference: Option<String>,
    pub item_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub from: Option<MovementLeg>,
    pub to: Option<MovementLeg>,
    #[validate(custom = "validate_positive_quantity")]
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 16))]
    pub uom: String,
    /// Movement date; defaults to now.
    pub moved_at: Option<DateTime<Utc>>,
}

/// Stock movement engine.
///
/// Movements are the sole writers of the balance ledger. Lifecycle:
/// `draft -> confirmed -> done`, or `draft/confirmed -> cancelled`. Posting
/// applies both legs as one atomic ledger batch; a movement is never left
/// half-posted. There is no reversal of a `done` movement; the recourse is
/// an equal-and-opposite adjustment.
///
/// Status transitions serialize on a per-movement lock with the same
/// bounded wait as the balance row locks, so concurrent confirm/post/cancel
/// calls for one id observe each other's transitions.
#[derive(Clone)]
pub struct MovementService {
    store: Arc<dyn InventoryStore>,
    balances: BalanceService,
    uom: UomService,
    locks: Arc<DashMap<(Partition, Uuid), Arc<Mutex<()>>>>,
    lock_wait: Duration,
    allow_negative_adjustments: bool,
    events: EventSender,
}

impl MovementService {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        balances: BalanceService,
        uom: UomService,
        config: &AppConfig,
        events: EventSender,
    ) -> Self {
        Self {
            store,
            balances,
            uom,
            locks: Arc::new(DashMap::new()),
            lock_wait: config.balance_lock_wait(),
            allow_negative_adjustments: config.allow_negative_adjustments,
            events,
        }
    }

    /// Creates a movement in `draft`, validating leg shape, locations and
    /// lot requirements up front.
    #[instrument(skip(self, input), fields(movement_type = %input.movement_type))]
    pub async fn create_movement(
        &self,
        part: &Partition,
        input: NewMovement,
    ) -> ServiceResult<StockMovement> {
        input.validate()?;

        let item = self
            .store
            .get_item(part, input.item_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("item {}", input.item_id)))?;

        self.check_leg_shape(&input)?;
        if let Some(leg) = &input.from {
            self.check_leg(part, leg, "source").await?;
        }
        if let Some(leg) = &input.to {
            self.check_leg(part, leg, "destination").await?;
        }
        if let (Some(from), Some(to)) = (&input.from, &input.to) {
            if from == to {
                return Err(ServiceError::validation(
                    "source and destination locations are identical",
                ));
            }
        }

        self.check_lot(part, &item, &input.lot_id, input.to.is_some())
            .await?;

        let movement = StockMovement {
            id: Uuid::new_v4(),
            movement_type: input.movement_type,
            reference: input.reference,
            item_id: item.id,
            lot_id: input.lot_id,
            from: input.from,
            to: input.to,
            quantity: input.quantity,
            uom: input.uom,
            status: MovementStatus::Draft,
            moved_at: input.moved_at.unwrap_or_else(Utc::now),
            created_at: Utc::now(),
            posted_at: None,
        };
        self.store.insert_movement(part, movement.clone()).await?;

        info!(movement_id = %movement.id, "movement created");
        self.events
            .emit(Event::MovementCreated {
                partition: part.clone(),
                movement_id: movement.id,
                movement_type: movement.movement_type,
            })
            .await;

        Ok(movement)
    }

    /// `draft -> confirmed`, with a lightweight availability pre-check on
    /// the outbound leg. The pre-check takes no lock and can go stale;
    /// posting re-checks under the row lock.
    #[instrument(skip(self))]
    pub async fn confirm_movement(&self, part: &Partition, id: Uuid) -> ServiceResult<StockMovement> {
        let _guard = self.lock_movement(part, id).await?;
        let mut movement = self.get_movement(part, id).await?;
        if movement.status != MovementStatus::Draft {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot confirm movement in status '{}'",
                movement.status
            )));
        }

        if movement.movement_type != MovementType::Adjustment {
            if let Some(from) = movement.from {
                let item = self.item_of(part, &movement).await?;
                let normalized = self.normalized_quantity(part, &movement, &item).await?;
                let balance = self
                    .balances
                    .get_balance(part, &balance_key(&movement, &from))
                    .await?;
                if balance.available() < normalized {
                    return Err(ServiceError::InsufficientStock(format!(
                        "insufficient available quantity: {} < {}",
                        balance.available(),
                        normalized
                    )));
                }
            }
        }

        movement.status = MovementStatus::Confirmed;
        self.store.update_movement(part, movement.clone()).await?;

        info!(movement_id = %movement.id, "movement confirmed");
        self.events
            .emit(Event::MovementConfirmed {
                partition: part.clone(),
                movement_id: movement.id,
            })
            .await;

        Ok(movement)
    }

    /// `confirmed -> done`: the committing transition.
    ///
    /// Normalizes the quantity into the item's base uom, then applies the
    /// outbound and inbound deltas as one atomic ledger batch together with
    /// the movement row. Insufficient availability fails the whole post
    /// unless the movement is an adjustment.
    #[instrument(skip(self))]
    pub async fn post_movement(&self, part: &Partition, id: Uuid) -> ServiceResult<StockMovement> {
        let _guard = self.lock_movement(part, id).await?;
        let movement = self.get_movement(part, id).await?;
        if movement.status != MovementStatus::Confirmed {
            return Err(ServiceError::InvalidStatus(format!(
                "only confirmed movements can be posted; status is '{}'",
                movement.status
            )));
        }

        let item = self.item_of(part, &movement).await?;
        // Lot status may have changed since creation.
        self.check_lot(part, &item, &movement.lot_id, movement.to.is_some())
            .await?;

        let normalized = self.normalized_quantity(part, &movement, &item).await?;
        let allow_negative = movement.movement_type == MovementType::Adjustment
            && self.allow_negative_adjustments;

        let mut deltas = Vec::with_capacity(2);
        if let Some(from) = movement.from {
            deltas.push(BalanceDelta {
                key: balance_key(&movement, &from),
                quantity_delta: -normalized,
                reserved_delta: Decimal::ZERO,
                uom: item.base_uom.clone(),
                allow_negative,
            });
        }
        if let Some(to) = movement.to {
            deltas.push(BalanceDelta {
                key: balance_key(&movement, &to),
                quantity_delta: normalized,
                reserved_delta: Decimal::ZERO,
                uom: item.base_uom.clone(),
                allow_negative,
            });
        }

        let mut done = movement;
        done.status = MovementStatus::Done;
        done.posted_at = Some(Utc::now());

        self.balances
            .apply_deltas_committing(part, deltas, Some(done.clone()))
            .await?;

        info!(movement_id = %done.id, quantity = %normalized, uom = %item.base_uom, "movement posted");
        self.events
            .emit(Event::MovementPosted {
                partition: part.clone(),
                movement_id: done.id,
                item_id: done.item_id,
                quantity: normalized,
            })
            .await;

        Ok(done)
    }

    /// `draft/confirmed -> cancelled`. No balance effect: `done` movements
    /// cannot be cancelled.
    #[instrument(skip(self))]
    pub async fn cancel_movement(&self, part: &Partition, id: Uuid) -> ServiceResult<StockMovement> {
        let _guard = self.lock_movement(part, id).await?;
        let mut movement = self.get_movement(part, id).await?;
        if movement.is_terminal() {
            return Err(ServiceError::InvalidStatus(format!(
                "cannot cancel movement in status '{}'",
                movement.status
            )));
        }

        movement.status = MovementStatus::Cancelled;
        self.store.update_movement(part, movement.clone()).await?;

        info!(movement_id = %movement.id, "movement cancelled");
        self.events
            .emit(Event::MovementCancelled {
                partition: part.clone(),
                movement_id: movement.id,
            })
            .await;

        Ok(movement)
    }

    pub async fn get_movement(&self, part: &Partition, id: Uuid) -> ServiceResult<StockMovement> {
        self.store
            .get_movement(part, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("movement {}", id)))
    }

    pub async fn list_movements(
        &self,
        part: &Partition,
        filter: &MovementFilter,
    ) -> ServiceResult<Vec<StockMovement>> {
        Ok(self.store.list_movements(part, filter).await?)
    }

    fn check_leg_shape(&self, input: &NewMovement) -> ServiceResult<()> {
        let shape = input.movement_type.leg_shape();
        let ok = match shape {
            LegShape::InboundOnly => input.to.is_some() && input.from.is_none(),
            LegShape::OutboundOnly => input.from.is_some() && input.to.is_none(),
            LegShape::Both => input.from.is_some() && input.to.is_some(),
            LegShape::AtLeastOne => input.from.is_some() || input.to.is_some(),
        };
        if !ok {
            return Err(ServiceError::validation(format!(
                "movement type '{}' does not allow this from/to combination",
                input.movement_type
            )));
        }
        Ok(())
    }

    async fn check_leg(
        &self,
        part: &Partition,
        leg: &MovementLeg,
        side: &str,
    ) -> ServiceResult<()> {
        let location = self
            .store
            .get_location(part, leg.location_id)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found(format!("{} location {}", side, leg.location_id))
            })?;
        if location.warehouse_id != leg.warehouse_id {
            return Err(ServiceError::validation(format!(
                "{} location '{}' does not belong to warehouse {}",
                side, location.code, leg.warehouse_id
            )));
        }
        Ok(())
    }

    /// Tracked items require an existing lot; inbound movements additionally
    /// reject rejected/expired lots.
    async fn check_lot(
        &self,
        part: &Partition,
        item: &Item,
        lot_id: &Option<Uuid>,
        inbound: bool,
    ) -> ServiceResult<()> {
        let lot_id = match lot_id {
            Some(id) => *id,
            None => {
                if item.tracking.requires_lot() {
                    return Err(ServiceError::validation(format!(
                        "item '{}' is {}-tracked and requires a lot",
                        item.sku, item.tracking
                    )));
                }
                return Ok(());
            }
        };

        let lot = self
            .store
            .get_lot(part, lot_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("lot {}", lot_id)))?;
        if lot.item_id != item.id {
            return Err(ServiceError::validation(format!(
                "lot '{}' does not belong to item '{}'",
                lot.lot_number, item.sku
            )));
        }
        if inbound && !lot.status.receivable() {
            return Err(ServiceError::business_rule(format!(
                "cannot receive into lot '{}' with status '{}'",
                lot.lot_number, lot.status
            )));
        }
        Ok(())
    }

    /// Takes the per-movement transition lock. Status is re-read after this
    /// returns, so a transition that lost the race fails on the status
    /// guard instead of committing twice.
    async fn lock_movement(
        &self,
        part: &Partition,
        id: Uuid,
    ) -> ServiceResult<OwnedMutexGuard<()>> {
        let mutex = self
            .locks
            .entry((part.clone(), id))
            .or_default()
            .clone();

        timeout(self.lock_wait, mutex.lock_owned())
            .await
            .map_err(|_| {
                ServiceError::LockTimeout(format!(
                    "movement still locked after {:?} [{}]",
                    self.lock_wait, id
                ))
            })
    }

    async fn item_of(&self, part: &Partition, movement: &StockMovement) -> ServiceResult<Item> {
        self.store
            .get_item(part, movement.item_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("item {}", movement.item_id)))
    }

    async fn normalized_quantity(
        &self,
        part: &Partition,
        movement: &StockMovement,
        item: &Item,
    ) -> ServiceResult<Decimal> {
        let factor = self
            .uom
            .resolve_factor(part, item.id, &movement.uom, &item.base_uom)
            .await?;
        Ok(movement.quantity * factor)
    }
}

fn balance_key(movement: &StockMovement, leg: &MovementLeg) -> BalanceKey {
    BalanceKey {
        item_id: movement.item_id,
        warehouse_id: leg.warehouse_id,
        location_id: leg.location_id,
        lot_id: movement.lot_id,
    }
}
