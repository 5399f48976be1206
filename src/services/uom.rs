use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::entities::{Partition, UomConversion};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::{Event, EventSender};
use crate::store::InventoryStore;

use super::validate_positive_quantity;

#[derive(Debug, Clone, Validate)]
pub struct NewConversion {
    /// `None` defines a global default conversion.
    pub item_id: Option<Uuid>,
    #[validate(length(min = 1, max = 16))]
    pub from_uom: String,
    #[validate(length(min = 1, max = 16))]
    pub to_uom: String,
    #[validate(custom = "validate_positive_quantity")]
    pub factor: Decimal,
}

/// Unit-of-measure conversion over a flat table.
///
/// Resolution is single-hop only: an item-specific row, then the global row,
/// then the inverses. No transitive chaining: a missing pair stays
/// unresolved even when intermediate units would connect it.
#[derive(Clone)]
pub struct UomService {
    store: Arc<dyn InventoryStore>,
    events: EventSender,
}

impl UomService {
    pub fn new(store: Arc<dyn InventoryStore>, events: EventSender) -> Self {
        Self { store, events }
    }

    #[instrument(skip(self, input), fields(from = %input.from_uom, to = %input.to_uom))]
    pub async fn define_conversion(
        &self,
        part: &Partition,
        input: NewConversion,
    ) -> ServiceResult<UomConversion> {
        input.validate()?;

        if input.from_uom == input.to_uom {
            return Err(ServiceError::validation(
                "conversion between identical units is implicit",
            ));
        }

        if self
            .store
            .find_conversion(part, input.item_id, &input.from_uom, &input.to_uom)
            .await?
            .is_some()
        {
            return Err(ServiceError::conflict(format!(
                "conversion {} -> {} already defined for this scope",
                input.from_uom, input.to_uom
            )));
        }

        let conversion = UomConversion {
            id: Uuid::new_v4(),
            item_id: input.item_id,
            from_uom: input.from_uom,
            to_uom: input.to_uom,
            factor: input.factor,
            created_at: Utc::now(),
        };
        self.store
            .insert_conversion(part, conversion.clone())
            .await?;

        self.events
            .emit(Event::ConversionDefined {
                partition: part.clone(),
                item_id: conversion.item_id,
                from_uom: conversion.from_uom.clone(),
                to_uom: conversion.to_uom.clone(),
            })
            .await;

        Ok(conversion)
    }

    /// Resolves the factor `f` such that `quantity_in_from * f =
    /// quantity_in_to`.
    ///
    /// Lookup order: identical units (1, no lookup), item-specific row,
    /// global row, then the same two in the inverse direction using
    /// `1/factor`.
    #[instrument(skip(self))]
    pub async fn resolve_factor(
        &self,
        part: &Partition,
        item_id: Uuid,
        from_uom: &str,
        to_uom: &str,
    ) -> ServiceResult<Decimal> {
        if from_uom == to_uom {
            return Ok(Decimal::ONE);
        }

        for scope in [Some(item_id), None] {
            if let Some(row) = self
                .store
                .find_conversion(part, scope, from_uom, to_uom)
                .await?
            {
                debug!(factor = %row.factor, global = scope.is_none(), "forward conversion");
                return Ok(row.factor);
            }
        }

        for scope in [Some(item_id), None] {
            if let Some(row) = self
                .store
                .find_conversion(part, scope, to_uom, from_uom)
                .await?
            {
                debug!(factor = %row.factor, global = scope.is_none(), "inverse conversion");
                return Ok(Decimal::ONE / row.factor);
            }
        }

        Err(ServiceError::validation(format!(
            "no conversion path from '{}' to '{}'",
            from_uom, to_uom
        )))
    }
}
