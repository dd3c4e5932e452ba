//! Inventory ledger entries and the ledger mutation primitive

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{InventoryError, ParseEnumError};

/// Eggs per standard tray
pub const EGGS_PER_TRAY: i64 = 30;

/// Largest quantity a ledger or transaction column can hold (two decimal
/// places, twelve integer digits)
pub fn max_quantity() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

/// The kind of resource a ledger entry tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Eggs,
    Food,
    Medicine,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Eggs => "eggs",
            ResourceKind::Food => "food",
            ResourceKind::Medicine => "medicine",
        }
    }

    /// Eggs and sacks of food are counted, medicine is measured.
    pub fn requires_whole_units(&self) -> bool {
        matches!(self, ResourceKind::Eggs | ResourceKind::Food)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eggs" => Ok(ResourceKind::Eggs),
            "food" => Ok(ResourceKind::Food),
            "medicine" => Ok(ResourceKind::Medicine),
            other => Err(ParseEnumError::new("resource kind", other)),
        }
    }
}

/// On-hand quantity of one resource. There is exactly one main egg ledger,
/// one egg ledger per sales manager, and one per food type and medicine, each
/// created when its owner is provisioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub resource_kind: ResourceKind,
    /// Food type, medicine or sales manager id; `None` for the main egg ledger
    pub resource_id: Option<Uuid>,
    pub on_hand_quantity: Decimal,
    /// Rejected (broken, cracked, dirty) eggs; always zero for other kinds
    pub rejected_quantity: i64,
    pub last_updated: DateTime<Utc>,
}

/// A signed change to a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDelta {
    pub on_hand: Decimal,
    pub rejected: i64,
}

impl LedgerDelta {
    pub fn credit(quantity: Decimal) -> Self {
        Self {
            on_hand: quantity,
            rejected: 0,
        }
    }

    pub fn debit(quantity: Decimal) -> Self {
        Self {
            on_hand: -quantity,
            rejected: 0,
        }
    }

    pub fn with_rejected(mut self, rejected: i64) -> Self {
        self.rejected = rejected;
        self
    }

    pub fn is_debit(&self) -> bool {
        self.on_hand < Decimal::ZERO || self.rejected < 0
    }
}

impl LedgerEntry {
    /// Human readable name of what this entry holds, for error messages
    pub fn describe(&self) -> String {
        match self.resource_id {
            Some(id) => format!("{} {}", self.resource_kind, id),
            None => self.resource_kind.to_string(),
        }
    }

    /// Check a delta against the current quantities without applying it.
    pub fn check_delta(&self, delta: &LedgerDelta) -> Result<(), InventoryError> {
        self.settle(delta).map(|_| ())
    }

    /// Apply a signed delta. Rejects without mutating if either quantity
    /// would go negative or out of range.
    pub fn apply_delta(
        &mut self,
        delta: &LedgerDelta,
        now: DateTime<Utc>,
    ) -> Result<(), InventoryError> {
        let (on_hand, rejected) = self.settle(delta)?;
        self.on_hand_quantity = on_hand;
        self.rejected_quantity = rejected;
        self.last_updated = now;
        Ok(())
    }

    /// Quantities after `delta`, if they stay within bounds
    fn settle(&self, delta: &LedgerDelta) -> Result<(Decimal, i64), InventoryError> {
        let on_hand = self
            .on_hand_quantity
            .checked_add(delta.on_hand)
            .filter(|total| *total <= max_quantity())
            .ok_or_else(|| out_of_range("quantity", self))?;
        if on_hand < Decimal::ZERO {
            return Err(InventoryError::InsufficientInventory {
                resource: self.describe(),
                available: self.on_hand_quantity,
                requested: -delta.on_hand,
            });
        }

        let rejected = self
            .rejected_quantity
            .checked_add(delta.rejected)
            .ok_or_else(|| out_of_range("rejected_quantity", self))?;
        if rejected < 0 {
            return Err(InventoryError::InsufficientInventory {
                resource: format!("rejected {}", self.describe()),
                available: Decimal::from(self.rejected_quantity),
                requested: Decimal::from(delta.rejected).abs(),
            });
        }

        Ok((on_hand, rejected))
    }

    /// Full trays and loose eggs for the egg ledger
    pub fn egg_trays(&self) -> Option<EggCount> {
        if self.resource_kind != ResourceKind::Eggs {
            return None;
        }
        let total = self.on_hand_quantity.trunc().to_i64().unwrap_or(0);
        Some(EggCount::from_total(total))
    }
}

fn out_of_range(field: &str, entry: &LedgerEntry) -> InventoryError {
    InventoryError::validation(
        field,
        format!("Change would take {} out of range", entry.describe()),
    )
}

/// An egg count split into full trays and loose eggs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EggCount {
    pub full_trays: i64,
    pub loose_eggs: i64,
}

impl EggCount {
    pub fn new(full_trays: i64, loose_eggs: i64) -> Self {
        Self {
            full_trays,
            loose_eggs,
        }
    }

    pub fn from_total(total: i64) -> Self {
        Self {
            full_trays: total / EGGS_PER_TRAY,
            loose_eggs: total % EGGS_PER_TRAY,
        }
    }

    /// Total eggs, or a validation error if the count does not fit
    pub fn total(&self) -> Result<i64, InventoryError> {
        self.full_trays
            .checked_mul(EGGS_PER_TRAY)
            .and_then(|eggs| eggs.checked_add(self.loose_eggs))
            .ok_or_else(|| InventoryError::validation("full_trays", "Egg count is out of range"))
    }
}
