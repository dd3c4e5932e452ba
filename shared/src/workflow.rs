//! Confirmation workflow engine
//!
//! Drives each transaction kind through its required confirmations and
//! applies exactly one ledger (or chicken house) mutation when the last
//! required confirmation arrives. Egg distributions are the one transfer:
//! they move eggs between two ledgers on creation. The engine works on in-memory records that
//! the caller has loaded (and locked); it validates everything before it
//! mutates anything, so a returned error means nothing changed and the caller
//! simply discards its unit of work.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InventoryError;
use crate::models::{
    ChickenHouse, Confirmation, ConfirmationSlot, InventoryTransaction, LedgerDelta, LedgerEntry,
    Principal, ResourceKind, Role, TransactionKind,
};
use crate::roles::{may_originate, originator_for, require_role};
use crate::validation::{
    validate_max_scale, validate_positive_quantity, validate_quantity_range, validate_whole_units,
};

/// Decimal places stored for quantities and totals
const QUANTITY_SCALE: u32 = 2;
/// Decimal places stored for unit prices
const PRICE_SCALE: u32 = 4;

/// Largest unit price the transaction columns hold
fn max_unit_price() -> Decimal {
    Decimal::new(99_999_999_999_999, PRICE_SCALE)
}

/// Largest total price the transaction columns hold
fn max_total_price() -> Decimal {
    Decimal::new(9_999_999_999_999_999, QUANTITY_SCALE)
}

/// Whether a transaction adds to or removes from what it targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
}

/// What a transaction's effect is applied to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "resource")]
pub enum EffectScope {
    Ledger(ResourceKind),
    ChickenHouse,
}

/// Creation and confirmation rules for one transaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindPolicy {
    pub originator: Role,
    /// Every slot must be confirmed before the effect applies. Empty means
    /// the effect applies on creation.
    pub confirmations: &'static [ConfirmationSlot],
    pub direction: Direction,
    pub scope: EffectScope,
}

const ON_CREATE: &[ConfirmationSlot] = &[];
const STOCK_MANAGER: &[ConfirmationSlot] = &[ConfirmationSlot::StockManager];
const RECEIVING_WORKER: &[ConfirmationSlot] = &[ConfirmationSlot::Worker];
const DOCTOR: &[ConfirmationSlot] = &[ConfirmationSlot::Doctor];
const DOCTOR_AND_WORKER: &[ConfirmationSlot] =
    &[ConfirmationSlot::Doctor, ConfirmationSlot::Worker];

/// Policy table for every transaction kind
pub fn policy(kind: TransactionKind) -> KindPolicy {
    let (confirmations, direction, scope) = match kind {
        TransactionKind::EggCollection => (
            STOCK_MANAGER,
            Direction::Increase,
            EffectScope::Ledger(ResourceKind::Eggs),
        ),
        TransactionKind::FoodPurchase => (
            ON_CREATE,
            Direction::Increase,
            EffectScope::Ledger(ResourceKind::Food),
        ),
        TransactionKind::FoodDistribution => (
            RECEIVING_WORKER,
            Direction::Decrease,
            EffectScope::Ledger(ResourceKind::Food),
        ),
        TransactionKind::MedicinePurchase => (
            ON_CREATE,
            Direction::Increase,
            EffectScope::Ledger(ResourceKind::Medicine),
        ),
        TransactionKind::MedicineDistribution => (
            DOCTOR_AND_WORKER,
            Direction::Decrease,
            EffectScope::Ledger(ResourceKind::Medicine),
        ),
        TransactionKind::EggDistribution => (
            ON_CREATE,
            Direction::Decrease,
            EffectScope::Ledger(ResourceKind::Eggs),
        ),
        TransactionKind::EggSale => (
            ON_CREATE,
            Direction::Decrease,
            EffectScope::Ledger(ResourceKind::Eggs),
        ),
        TransactionKind::ChickenDeathRecord => {
            (DOCTOR, Direction::Decrease, EffectScope::ChickenHouse)
        }
    };

    KindPolicy {
        originator: originator_for(kind),
        confirmations,
        direction,
        scope,
    }
}

impl KindPolicy {
    pub fn applies_on_create(&self) -> bool {
        self.confirmations.is_empty()
    }

    pub fn requires_house(&self, kind: TransactionKind) -> bool {
        matches!(
            kind,
            TransactionKind::EggCollection
                | TransactionKind::FoodDistribution
                | TransactionKind::MedicineDistribution
                | TransactionKind::ChickenDeathRecord
        )
    }
}

/// Kinds that carry a separate rejected-egg count
fn carries_rejected_eggs(kind: TransactionKind) -> bool {
    matches!(kind, TransactionKind::EggCollection | TransactionKind::EggSale)
}

/// Kinds delivered to a chicken house and acknowledged by its worker
fn is_distribution(kind: TransactionKind) -> bool {
    matches!(
        kind,
        TransactionKind::FoodDistribution | TransactionKind::MedicineDistribution
    )
}

/// Kinds that move stock from one ledger to another
fn is_transfer(kind: TransactionKind) -> bool {
    kind == TransactionKind::EggDistribution
}

/// A transaction as requested by its originator, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub kind: TransactionKind,
    pub quantity: Decimal,
    pub rejected_quantity: i64,
    pub unit_price: Option<Decimal>,
    pub counterparty: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl TransactionDraft {
    pub fn new(kind: TransactionKind, quantity: Decimal) -> Self {
        Self {
            kind,
            quantity,
            rejected_quantity: 0,
            unit_price: None,
            counterparty: None,
            expiry_date: None,
            notes: None,
        }
    }
}

/// The record an effect is applied to
#[derive(Debug)]
pub enum EffectTarget<'a> {
    Ledger(&'a mut LedgerEntry),
    House(&'a mut ChickenHouse),
}

/// A mutation the engine performed, for the caller to persist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "target")]
pub enum AppliedEffect {
    Ledger { ledger_id: Uuid, delta: LedgerDelta },
    Transfer {
        from_ledger_id: Uuid,
        to_ledger_id: Uuid,
        quantity: Decimal,
    },
    House { chicken_house_id: Uuid, removed: i32 },
}

/// Result of creating a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Origination {
    pub transaction: InventoryTransaction,
    pub effect: Option<AppliedEffect>,
}

/// Result of a successful confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmOutcome {
    pub slot: ConfirmationSlot,
    /// Set only by the confirmation that completed the required set
    pub effect: Option<AppliedEffect>,
}

/// Stateless engine for creating and confirming transactions
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmationWorkflow;

impl ConfirmationWorkflow {
    pub fn new() -> Self {
        Self
    }

    /// Create a transaction on behalf of `actor`.
    ///
    /// `ledger` must be the entry the kind affects (locked by the caller),
    /// `house` the target chicken house where the kind needs one. Kinds
    /// without confirmations apply their effect to `ledger` immediately.
    pub fn originate(
        &self,
        draft: TransactionDraft,
        actor: &Principal,
        ledger: Option<&mut LedgerEntry>,
        house: Option<&ChickenHouse>,
        now: DateTime<Utc>,
    ) -> Result<Origination, InventoryError> {
        let kind = draft.kind;
        let rules = policy(kind);

        if !may_originate(kind, actor.role) {
            return Err(InventoryError::RoleViolation {
                required: rules.originator,
                action: format!("create {}", kind),
            });
        }
        if is_transfer(kind) {
            return Err(InventoryError::validation(
                "destination",
                format!("{} needs a receiving ledger", kind),
            ));
        }
        self.validate_draft(&draft, &rules)?;

        let house = match (rules.requires_house(kind), house) {
            (true, Some(house)) => Some(house),
            (true, None) => return Err(InventoryError::NotFound("Chicken house".to_string())),
            (false, _) => None,
        };

        let ledger = match (rules.scope, ledger) {
            (EffectScope::Ledger(resource), Some(entry)) => {
                if entry.resource_kind != resource {
                    return Err(InventoryError::validation(
                        "resource",
                        format!("{} must reference a {} ledger", kind, resource),
                    ));
                }
                if resource == ResourceKind::Eggs {
                    check_egg_stock_owner(kind, actor, entry)?;
                }
                Some(entry)
            }
            (EffectScope::Ledger(_), None) => {
                return Err(InventoryError::NotFound("Ledger entry".to_string()))
            }
            (EffectScope::ChickenHouse, _) => None,
        };

        let mut assigned_worker_id = None;
        if let Some(house) = house {
            if kind == TransactionKind::EggCollection && house.worker_id != Some(actor.id) {
                return Err(InventoryError::RoleViolation {
                    required: Role::Worker,
                    action: format!("record egg collections for {}", house.name),
                });
            }
            if is_distribution(kind) {
                let worker = house.worker_id.ok_or_else(|| {
                    InventoryError::validation(
                        "chicken_house_id",
                        "Worker must be assigned to the target chicken house",
                    )
                })?;
                assigned_worker_id = Some(worker);
            }
        }

        let delta = ledger_delta(kind, draft.quantity, draft.rejected_quantity);
        if let Some(entry) = ledger.as_deref() {
            // Distributions reserve nothing, but refuse to start when the
            // stock cannot cover them right now.
            if delta.is_debit() {
                entry.check_delta(&delta)?;
            }
        }

        let mut transaction = new_transaction(
            draft,
            actor,
            ledger.as_deref().map(|entry| entry.id),
            house.map(|h| h.id),
            now,
        )?;
        transaction.assigned_worker_id = assigned_worker_id;

        let mut effect = None;
        if rules.applies_on_create() {
            if let Some(entry) = ledger {
                entry.apply_delta(&delta, now)?;
                transaction.effect_applied = true;
                transaction.applied_at = Some(now);
                effect = Some(AppliedEffect::Ledger {
                    ledger_id: entry.id,
                    delta,
                });
            }
        }

        Ok(Origination {
            transaction,
            effect,
        })
    }

    /// Hand eggs from the main egg ledger to a sales manager's egg ledger.
    ///
    /// Both entries must be locked by the caller. The transfer applies on
    /// creation: `source` is debited and `destination` credited, or neither
    /// changes.
    pub fn originate_transfer(
        &self,
        draft: TransactionDraft,
        actor: &Principal,
        source: &mut LedgerEntry,
        destination: &mut LedgerEntry,
        now: DateTime<Utc>,
    ) -> Result<Origination, InventoryError> {
        let kind = draft.kind;
        if !is_transfer(kind) {
            return Err(InventoryError::validation(
                "kind",
                format!("{} does not move stock between ledgers", kind),
            ));
        }
        let rules = policy(kind);

        require_role(actor, rules.originator, &format!("create {}", kind))?;
        self.validate_draft(&draft, &rules)?;

        if source.resource_kind != ResourceKind::Eggs || source.resource_id.is_some() {
            return Err(InventoryError::validation(
                "source",
                "Eggs are distributed from the main egg ledger",
            ));
        }
        if destination.resource_kind != ResourceKind::Eggs || destination.resource_id.is_none() {
            return Err(InventoryError::validation(
                "sales_manager_id",
                "Eggs can only be distributed to a sales manager",
            ));
        }

        let debit = LedgerDelta::debit(draft.quantity);
        let credit = LedgerDelta::credit(draft.quantity);
        source.check_delta(&debit)?;
        destination.check_delta(&credit)?;

        let mut transaction = new_transaction(draft, actor, Some(source.id), None, now)?;
        transaction.destination_ledger_id = Some(destination.id);

        source.apply_delta(&debit, now)?;
        destination.apply_delta(&credit, now)?;
        transaction.effect_applied = true;
        transaction.applied_at = Some(now);

        Ok(Origination {
            effect: Some(AppliedEffect::Transfer {
                from_ledger_id: source.id,
                to_ledger_id: destination.id,
                quantity: transaction.quantity,
            }),
            transaction,
        })
    }

    /// Record `actor`'s confirmation in `slot`.
    ///
    /// When this fills the last required slot, the effect is applied to
    /// `target` before the confirmation is recorded; if the effect is
    /// rejected the transaction and the target are left exactly as they were.
    pub fn confirm(
        &self,
        transaction: &mut InventoryTransaction,
        slot: ConfirmationSlot,
        actor: &Principal,
        notes: Option<String>,
        target: EffectTarget<'_>,
        now: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, InventoryError> {
        let kind = transaction.kind;
        let rules = policy(kind);

        if !rules.confirmations.contains(&slot) {
            return Err(InventoryError::validation(
                "slot",
                format!("{} does not take a {} confirmation", kind, slot),
            ));
        }

        require_role(
            actor,
            slot.required_role(),
            &format!("confirm {} as {}", kind, slot),
        )?;

        if slot == ConfirmationSlot::Worker && transaction.assigned_worker_id != Some(actor.id) {
            return Err(InventoryError::RoleViolation {
                required: Role::Worker,
                action: format!("confirm a {} assigned to another worker", kind),
            });
        }

        if transaction.is_confirmed(slot) {
            return Err(InventoryError::AlreadyConfirmed(format!(
                "{} {} ({} slot)",
                kind, transaction.id, slot
            )));
        }

        let completes = rules
            .confirmations
            .iter()
            .all(|required| *required == slot || transaction.is_confirmed(*required));

        let effect = if completes && !transaction.effect_applied {
            Some(apply_effect(transaction, &rules, target, now)?)
        } else {
            None
        };

        transaction.confirmations.push(Confirmation {
            slot,
            confirmed_by: actor.id,
            confirmed_at: now,
            notes,
        });
        if effect.is_some() {
            transaction.effect_applied = true;
            transaction.applied_at = Some(now);
        }

        Ok(ConfirmOutcome { slot, effect })
    }

    fn validate_draft(
        &self,
        draft: &TransactionDraft,
        rules: &KindPolicy,
    ) -> Result<(), InventoryError> {
        validate_positive_quantity("quantity", draft.quantity)?;
        validate_quantity_range("quantity", draft.quantity)?;
        validate_max_scale("quantity", draft.quantity, QUANTITY_SCALE)?;

        let whole_units = match rules.scope {
            EffectScope::Ledger(resource) => resource.requires_whole_units(),
            EffectScope::ChickenHouse => true,
        };
        if whole_units {
            validate_whole_units("quantity", draft.quantity)?;
        }

        if rules.scope == EffectScope::ChickenHouse && draft.quantity.to_i32().is_none() {
            return Err(InventoryError::validation(
                "quantity",
                "Number of dead chickens is out of range",
            ));
        }

        if draft.rejected_quantity < 0 {
            return Err(InventoryError::validation(
                "rejected_quantity",
                "Rejected eggs cannot be negative",
            ));
        }
        if draft.rejected_quantity > 0 && !carries_rejected_eggs(draft.kind) {
            return Err(InventoryError::validation(
                "rejected_quantity",
                format!("{} does not carry rejected eggs", draft.kind),
            ));
        }

        if let Some(price) = draft.unit_price {
            if price < Decimal::ZERO {
                return Err(InventoryError::validation(
                    "unit_price",
                    "Price cannot be negative",
                ));
            }
            if price > max_unit_price() {
                return Err(InventoryError::validation("unit_price", "Price is too large"));
            }
            validate_max_scale("unit_price", price, PRICE_SCALE)?;
        }

        Ok(())
    }
}

/// A new, unapplied transaction built from a validated draft
fn new_transaction(
    draft: TransactionDraft,
    actor: &Principal,
    ledger_id: Option<Uuid>,
    chicken_house_id: Option<Uuid>,
    now: DateTime<Utc>,
) -> Result<InventoryTransaction, InventoryError> {
    let total_price = draft
        .unit_price
        .map(|price| total_price(price, draft.quantity))
        .transpose()?;

    Ok(InventoryTransaction {
        id: Uuid::new_v4(),
        kind: draft.kind,
        ledger_id,
        destination_ledger_id: None,
        chicken_house_id,
        quantity: draft.quantity,
        rejected_quantity: draft.rejected_quantity,
        unit_price: draft.unit_price,
        total_price,
        counterparty: draft.counterparty,
        expiry_date: draft.expiry_date,
        notes: draft.notes,
        created_by: actor.id,
        assigned_worker_id: None,
        created_at: now,
        confirmations: Vec::new(),
        effect_applied: false,
        applied_at: None,
    })
}

/// Unit price times quantity, rounded half away from zero to cents
pub fn total_price(unit_price: Decimal, quantity: Decimal) -> Result<Decimal, InventoryError> {
    unit_price
        .checked_mul(quantity)
        .map(|total| {
            total.round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::MidpointAwayFromZero)
        })
        .filter(|total| *total <= max_total_price())
        .ok_or_else(|| InventoryError::validation("total_price", "Total price is too large"))
}

/// Sales managers sell from their own egg ledger; everyone else works on
/// the main egg ledger.
fn check_egg_stock_owner(
    kind: TransactionKind,
    actor: &Principal,
    entry: &LedgerEntry,
) -> Result<(), InventoryError> {
    let owner = (actor.role == Role::SalesManager).then_some(actor.id);
    if entry.resource_id == owner {
        return Ok(());
    }
    if owner.is_some() {
        return Err(InventoryError::RoleViolation {
            required: Role::SalesManager,
            action: "sell eggs from another sales manager's stock".to_string(),
        });
    }
    Err(InventoryError::validation(
        "resource",
        format!("{} must use the main egg ledger", kind),
    ))
}

/// Signed ledger delta for a kind's direction
fn ledger_delta(kind: TransactionKind, quantity: Decimal, rejected: i64) -> LedgerDelta {
    match policy(kind).direction {
        Direction::Increase => LedgerDelta::credit(quantity).with_rejected(rejected),
        Direction::Decrease => LedgerDelta::debit(quantity).with_rejected(-rejected),
    }
}

fn apply_effect(
    transaction: &InventoryTransaction,
    rules: &KindPolicy,
    target: EffectTarget<'_>,
    now: DateTime<Utc>,
) -> Result<AppliedEffect, InventoryError> {
    match (rules.scope, target) {
        (EffectScope::Ledger(_), EffectTarget::Ledger(entry)) => {
            if transaction.ledger_id != Some(entry.id) {
                return Err(InventoryError::NotFound("Ledger entry".to_string()));
            }
            let delta = ledger_delta(
                transaction.kind,
                transaction.quantity,
                transaction.rejected_quantity,
            );
            entry.apply_delta(&delta, now)?;
            Ok(AppliedEffect::Ledger {
                ledger_id: entry.id,
                delta,
            })
        }
        (EffectScope::ChickenHouse, EffectTarget::House(house)) => {
            if transaction.chicken_house_id != Some(house.id) {
                return Err(InventoryError::NotFound("Chicken house".to_string()));
            }
            let dead = transaction.quantity.to_i32().unwrap_or(i32::MAX);
            let removed = house.record_deaths(dead);
            house.updated_at = now;
            Ok(AppliedEffect::House {
                chicken_house_id: house.id,
                removed,
            })
        }
        _ => Err(InventoryError::validation(
            "target",
            format!("{} cannot be applied to this record", transaction.kind),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_table_matches_confirmation_requirements() {
        use crate::models::ConfirmationSlot::*;

        assert_eq!(policy(TransactionKind::EggCollection).confirmations, &[StockManager]);
        assert_eq!(policy(TransactionKind::FoodDistribution).confirmations, &[Worker]);
        assert_eq!(
            policy(TransactionKind::MedicineDistribution).confirmations,
            &[Doctor, Worker]
        );
        assert_eq!(policy(TransactionKind::ChickenDeathRecord).confirmations, &[Doctor]);

        for kind in [
            TransactionKind::FoodPurchase,
            TransactionKind::MedicinePurchase,
            TransactionKind::EggDistribution,
            TransactionKind::EggSale,
        ] {
            assert!(policy(kind).applies_on_create(), "{kind} should apply on create");
        }
    }

    #[test]
    fn only_purchases_and_collections_increase_stock() {
        for kind in TransactionKind::ALL {
            let expected = matches!(
                kind,
                TransactionKind::EggCollection
                    | TransactionKind::FoodPurchase
                    | TransactionKind::MedicinePurchase
            );
            assert_eq!(policy(kind).direction == Direction::Increase, expected);
        }
    }

    #[test]
    fn death_records_are_house_scoped() {
        assert_eq!(
            policy(TransactionKind::ChickenDeathRecord).scope,
            EffectScope::ChickenHouse
        );
        assert_eq!(
            policy(TransactionKind::EggSale).scope,
            EffectScope::Ledger(ResourceKind::Eggs)
        );
    }

    #[test]
    fn collection_delta_credits_rejected_eggs() {
        let delta = ledger_delta(TransactionKind::EggCollection, Decimal::from(60), 3);
        assert_eq!(delta, LedgerDelta::credit(Decimal::from(60)).with_rejected(3));

        let delta = ledger_delta(TransactionKind::EggSale, Decimal::from(60), 3);
        assert_eq!(delta, LedgerDelta::debit(Decimal::from(60)).with_rejected(-3));
    }

    #[test]
    fn total_price_rounds_to_cents() {
        let price = Decimal::new(12345, 4); // 1.2345
        assert_eq!(total_price(price, Decimal::from(3)).unwrap(), Decimal::new(370, 2));
        assert_eq!(
            total_price(Decimal::new(5, 3), Decimal::ONE).unwrap(),
            Decimal::new(1, 2)
        );
        assert!(total_price(max_unit_price(), Decimal::from(1_000_000)).is_err());
    }
}
