use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a stock balance row.
///
/// `lot_id` is `None` for items with no lot tracking. The key is totally
/// ordered so multi-key lock acquisition can always happen in a consistent
/// order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub lot_id: Option<Uuid>,
}

impl std::fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "item={} wh={} loc={} lot={}",
            self.item_id,
            self.warehouse_id,
            self.location_id,
            self.lot_id
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".into()),
        )
    }
}

/// Current on-hand and reserved quantity for one balance key.
///
/// One row per key, upsert semantics; rows are created on the first movement
/// touching the key and never deleted. Invariant:
/// `0 <= reserved_quantity <= quantity` unless an explicit negative-stock
/// override was applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockBalance {
    pub item_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity: Decimal,
    pub reserved_quantity: Decimal,
    pub uom: String,
    pub updated_at: DateTime<Utc>,
}

impl StockBalance {
    /// Zero-valued balance for a key that has no stored row yet.
    pub fn zero(key: &BalanceKey, uom: impl Into<String>) -> Self {
        Self {
            item_id: key.item_id,
            warehouse_id: key.warehouse_id,
            location_id: key.location_id,
            lot_id: key.lot_id,
            quantity: Decimal::ZERO,
            reserved_quantity: Decimal::ZERO,
            uom: uom.into(),
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> BalanceKey {
        BalanceKey {
            item_id: self.item_id,
            warehouse_id: self.warehouse_id,
            location_id: self.location_id,
            lot_id: self.lot_id,
        }
    }

    pub fn available(&self) -> Decimal {
        self.quantity - self.reserved_quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn available_is_quantity_minus_reserved() {
        let key = BalanceKey {
            item_id: Uuid::new_v4(),
            warehouse_id: Uuid::new_v4(),
            location_id: Uuid::new_v4(),
            lot_id: None,
        };
        let mut bal = StockBalance::zero(&key, "kg");
        bal.quantity = dec!(10);
        bal.reserved_quantity = dec!(4);
        assert_eq!(bal.available(), dec!(6));
        assert_eq!(bal.key(), key);
    }

    #[test]
    fn keys_order_consistently() {
        let a = BalanceKey {
            item_id: Uuid::nil(),
            warehouse_id: Uuid::nil(),
            location_id: Uuid::nil(),
            lot_id: None,
        };
        let b = BalanceKey {
            lot_id: Some(Uuid::from_u128(1)),
            ..a.clone()
        };
        assert!(a < b);
    }
}
