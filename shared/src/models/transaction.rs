//! Inventory transactions and their confirmations

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;
use crate::error::ParseEnumError;

/// Kinds of resource movement recorded on the farm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    EggCollection,
    FoodPurchase,
    FoodDistribution,
    MedicinePurchase,
    MedicineDistribution,
    EggDistribution,
    EggSale,
    ChickenDeathRecord,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 8] = [
        TransactionKind::EggCollection,
        TransactionKind::FoodPurchase,
        TransactionKind::FoodDistribution,
        TransactionKind::MedicinePurchase,
        TransactionKind::MedicineDistribution,
        TransactionKind::EggDistribution,
        TransactionKind::EggSale,
        TransactionKind::ChickenDeathRecord,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::EggCollection => "egg_collection",
            TransactionKind::FoodPurchase => "food_purchase",
            TransactionKind::FoodDistribution => "food_distribution",
            TransactionKind::MedicinePurchase => "medicine_purchase",
            TransactionKind::MedicineDistribution => "medicine_distribution",
            TransactionKind::EggDistribution => "egg_distribution",
            TransactionKind::EggSale => "egg_sale",
            TransactionKind::ChickenDeathRecord => "chicken_death_record",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::EggCollection => write!(f, "Egg collection"),
            TransactionKind::FoodPurchase => write!(f, "Food purchase"),
            TransactionKind::FoodDistribution => write!(f, "Food distribution"),
            TransactionKind::MedicinePurchase => write!(f, "Medicine purchase"),
            TransactionKind::MedicineDistribution => write!(f, "Medicine distribution"),
            TransactionKind::EggDistribution => write!(f, "Egg distribution"),
            TransactionKind::EggSale => write!(f, "Egg sale"),
            TransactionKind::ChickenDeathRecord => write!(f, "Chicken death record"),
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("transaction kind", s))
    }
}

/// An approval a transaction may need before it takes effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationSlot {
    StockManager,
    Worker,
    Doctor,
}

impl ConfirmationSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationSlot::StockManager => "stock_manager",
            ConfirmationSlot::Worker => "worker",
            ConfirmationSlot::Doctor => "doctor",
        }
    }

    /// The slot an actor holding `role` fills, if any
    pub fn for_role(role: Role) -> Option<Self> {
        match role {
            Role::StockManager => Some(ConfirmationSlot::StockManager),
            Role::Worker => Some(ConfirmationSlot::Worker),
            Role::Doctor => Some(ConfirmationSlot::Doctor),
            Role::Admin | Role::SalesManager | Role::Customer => None,
        }
    }

    /// Role an actor must hold to fill this slot
    pub fn required_role(&self) -> Role {
        match self {
            ConfirmationSlot::StockManager => Role::StockManager,
            ConfirmationSlot::Worker => Role::Worker,
            ConfirmationSlot::Doctor => Role::Doctor,
        }
    }
}

impl std::fmt::Display for ConfirmationSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConfirmationSlot {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stock_manager" => Ok(ConfirmationSlot::StockManager),
            "worker" => Ok(ConfirmationSlot::Worker),
            "doctor" => Ok(ConfirmationSlot::Doctor),
            other => Err(ParseEnumError::new("confirmation slot", other)),
        }
    }
}

/// A recorded confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub slot: ConfirmationSlot,
    pub confirmed_by: Uuid,
    pub confirmed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Lifecycle state derived from the effect flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Applied,
}

/// A proposed or applied movement of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub kind: TransactionKind,
    /// Ledger affected; `None` for death records. The source ledger of an
    /// egg distribution.
    pub ledger_id: Option<Uuid>,
    /// Sales manager egg ledger credited by an egg distribution
    pub destination_ledger_id: Option<Uuid>,
    pub chicken_house_id: Option<Uuid>,
    pub quantity: Decimal,
    /// Rejected eggs carried by egg collections and sales
    pub rejected_quantity: i64,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    /// Supplier for purchases, buyer for sales
    pub counterparty: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    /// Worker who must confirm receipt of a distribution
    pub assigned_worker_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub confirmations: Vec<Confirmation>,
    pub effect_applied: bool,
    pub applied_at: Option<DateTime<Utc>>,
}

impl InventoryTransaction {
    pub fn is_confirmed(&self, slot: ConfirmationSlot) -> bool {
        self.confirmations.iter().any(|c| c.slot == slot)
    }

    pub fn confirmation(&self, slot: ConfirmationSlot) -> Option<&Confirmation> {
        self.confirmations.iter().find(|c| c.slot == slot)
    }

    /// Required slots still waiting for a confirmation
    pub fn pending_slots(&self) -> Vec<ConfirmationSlot> {
        crate::workflow::policy(self.kind)
            .confirmations
            .iter()
            .copied()
            .filter(|slot| !self.is_confirmed(*slot))
            .collect()
    }

    pub fn status(&self) -> TransactionStatus {
        if self.effect_applied {
            TransactionStatus::Applied
        } else {
            TransactionStatus::Pending
        }
    }
}
