use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;
use tracing::{info, instrument};

use crate::config::AppConfig;
use crate::entities::{BalanceKey, Partition, StockBalance, StockMovement};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::store::{BalanceFilter, InventoryStore};

/// One delta against one balance row.
#[derive(Debug, Clone)]
pub struct BalanceDelta {
    pub key: BalanceKey,
    pub quantity_delta: Decimal,
    pub reserved_delta: Decimal,
    pub uom: String,
    /// Skips the non-negativity and reservation-bound checks. Only
    /// adjustment movements correcting known discrepancies set this.
    pub allow_negative: bool,
}

/// Stock balance ledger: the only writer of balance rows.
///
/// Concurrent writers touching the same key serialize on a per-key lock with
/// a bounded wait; writers on disjoint keys never contend. Every batch is
/// validated in full before anything is written, so a failing leg leaves the
/// other legs untouched.
#[derive(Clone)]
pub struct BalanceService {
    store: Arc<dyn InventoryStore>,
    // One entry per touched key, never evicted; bounded by balance-row
    // cardinality, which never shrinks either (rows are not deleted).
    locks: Arc<DashMap<(Partition, BalanceKey), Arc<Mutex<()>>>>,
    lock_wait: Duration,
    events: EventSender,
}

impl BalanceService {
    pub fn new(store: Arc<dyn InventoryStore>, config: &AppConfig, events: EventSender) -> Self {
        Self {
            store,
            locks: Arc::new(DashMap::new()),
            lock_wait: config.balance_lock_wait(),
            events,
        }
    }

    /// Current balance for a key. Returns a zero-valued row when none is
    /// stored, never a not-found error. The zero row carries the item's
    /// base uom when the item is known and an empty uom when the key's item
    /// does not exist in the partition.
    pub async fn get_balance(
        &self,
        part: &Partition,
        key: &BalanceKey,
    ) -> ServiceResult<StockBalance> {
        if let Some(balance) = self.store.get_balance(part, key).await? {
            return Ok(balance);
        }
        let uom = self
            .store
            .get_item(part, key.item_id)
            .await?
            .map(|item| item.base_uom)
            .unwrap_or_default();
        Ok(StockBalance::zero(key, uom))
    }

    pub async fn list_balances(
        &self,
        part: &Partition,
        filter: &BalanceFilter,
    ) -> ServiceResult<Vec<StockBalance>> {
        Ok(self.store.list_balances(part, filter).await?)
    }

    /// Applies one delta atomically. See [`Self::apply_deltas`].
    pub async fn apply_delta(
        &self,
        part: &Partition,
        delta: BalanceDelta,
    ) -> ServiceResult<StockBalance> {
        let mut applied = self.apply_deltas(part, vec![delta]).await?;
        Ok(applied.remove(0))
    }

    /// Applies a batch of deltas as one atomic unit: all keys are locked (in
    /// key order, bounded wait), every resulting row is validated, and only
    /// then is the whole batch written. Rejects batches that would drive
    /// `quantity` or `reserved_quantity` negative or `reserved > quantity`,
    /// unless the delta carries `allow_negative`.
    pub async fn apply_deltas(
        &self,
        part: &Partition,
        deltas: Vec<BalanceDelta>,
    ) -> ServiceResult<Vec<StockBalance>> {
        self.apply_deltas_committing(part, deltas, None).await
    }

    /// Convenience wrapper: reserve `quantity` units against a key.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        part: &Partition,
        key: &BalanceKey,
        quantity: Decimal,
    ) -> ServiceResult<StockBalance> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::validation("reserve quantity must be positive"));
        }
        let current = self.get_balance(part, key).await?;
        self.apply_delta(
            part,
            BalanceDelta {
                key: key.clone(),
                quantity_delta: Decimal::ZERO,
                reserved_delta: quantity,
                uom: current.uom,
                allow_negative: false,
            },
        )
        .await
    }

    /// Convenience wrapper: release previously reserved units.
    #[instrument(skip(self))]
    pub async fn release(
        &self,
        part: &Partition,
        key: &BalanceKey,
        quantity: Decimal,
    ) -> ServiceResult<StockBalance> {
        if quantity <= Decimal::ZERO {
            return Err(ServiceError::validation("release quantity must be positive"));
        }
        let current = self.get_balance(part, key).await?;
        self.apply_delta(
            part,
            BalanceDelta {
                key: key.clone(),
                quantity_delta: Decimal::ZERO,
                reserved_delta: -quantity,
                uom: current.uom,
                allow_negative: false,
            },
        )
        .await
    }

    /// Shared commit path for plain delta application and movement posting.
    /// When `movement` is given, the movement row and the balance rows land
    /// in one store transaction.
    pub(crate) async fn apply_deltas_committing(
        &self,
        part: &Partition,
        deltas: Vec<BalanceDelta>,
        movement: Option<StockMovement>,
    ) -> ServiceResult<Vec<StockBalance>> {
        if deltas.is_empty() {
            return Err(ServiceError::validation("empty balance delta batch"));
        }

        let mut keys: Vec<BalanceKey> = deltas.iter().map(|d| d.key.clone()).collect();
        keys.sort();
        if keys.windows(2).any(|w| w[0] == w[1]) {
            return Err(ServiceError::validation(
                "duplicate balance key in delta batch",
            ));
        }

        // Sorted acquisition keeps concurrent multi-key batches deadlock-free.
        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.lock_key(part, key).await?);
        }

        let mut updated = Vec::with_capacity(deltas.len());
        for delta in &deltas {
            let current = self.store.get_balance(part, &delta.key).await?;
            updated.push(self.checked_apply(current, delta)?);
        }

        match movement {
            Some(movement) => {
                self.store
                    .commit_movement(part, movement, updated.clone())
                    .await?
            }
            None => self.store.upsert_balances(part, updated.clone()).await?,
        }
        drop(guards);

        for balance in &updated {
            info!(
                key = %balance.key(),
                quantity = %balance.quantity,
                reserved = %balance.reserved_quantity,
                "balance updated"
            );
            self.events
                .emit(Event::BalanceChanged {
                    partition: part.clone(),
                    item_id: balance.item_id,
                    warehouse_id: balance.warehouse_id,
                    location_id: balance.location_id,
                    lot_id: balance.lot_id,
                    quantity: balance.quantity,
                    reserved_quantity: balance.reserved_quantity,
                })
                .await;
        }

        Ok(updated)
    }

    fn checked_apply(
        &self,
        current: Option<StockBalance>,
        delta: &BalanceDelta,
    ) -> ServiceResult<StockBalance> {
        let mut balance = match current {
            Some(existing) => {
                if existing.uom != delta.uom {
                    return Err(ServiceError::validation(format!(
                        "uom '{}' does not match stored balance uom '{}' [{}]",
                        delta.uom, existing.uom, delta.key
                    )));
                }
                existing
            }
            None => StockBalance::zero(&delta.key, delta.uom.clone()),
        };

        let available = balance.available();
        let new_quantity = balance.quantity + delta.quantity_delta;
        let new_reserved = balance.reserved_quantity + delta.reserved_delta;

        if !delta.allow_negative {
            if new_reserved < Decimal::ZERO {
                return Err(ServiceError::business_rule(format!(
                    "reserved quantity cannot go negative [{}]",
                    delta.key
                )));
            }
            if new_quantity < Decimal::ZERO || new_reserved > new_quantity {
                if delta.reserved_delta > Decimal::ZERO {
                    return Err(ServiceError::business_rule(format!(
                        "cannot reserve beyond on-hand quantity: {} > {} [{}]",
                        new_reserved, new_quantity, delta.key
                    )));
                }
                return Err(ServiceError::InsufficientStock(format!(
                    "insufficient available quantity: {} < {} [{}]",
                    available, -delta.quantity_delta, delta.key
                )));
            }
        }

        balance.quantity = new_quantity;
        balance.reserved_quantity = new_reserved;
        balance.updated_at = Utc::now();
        Ok(balance)
    }

    /// Takes the per-key lock, waiting at most the configured bound before
    /// failing with a retryable lock-timeout error.
    async fn lock_key(
        &self,
        part: &Partition,
        key: &BalanceKey,
    ) -> ServiceResult<OwnedMutexGuard<()>> {
        let mutex = self
            .locks
            .entry((part.clone(), key.clone()))
            .or_default()
            .clone();

        timeout(self.lock_wait, mutex.lock_owned())
            .await
            .map_err(|_| {
                ServiceError::LockTimeout(format!(
                    "balance row still locked after {:?} [{}]",
                    self.lock_wait, key
                ))
            })
    }
}
