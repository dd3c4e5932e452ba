//! Confirmation workflow tests
//!
//! End-to-end scenarios for every transaction kind, driven through the
//! in-memory engine the services wrap:
//! - Effects apply exactly once, on the last required confirmation
//! - Failed calls leave the transaction and its target untouched
//! - Ledgers never go negative
//! - Egg distributions move eggs between two ledgers or neither

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::{
    AppliedEffect, ChickenHouse, ConfirmationSlot, ConfirmationWorkflow, EffectTarget, InventoryError,
    InventoryTransaction, LedgerEntry, Principal, ResourceKind, Role, TransactionDraft,
    TransactionKind, TransactionStatus,
};

// ============================================================================
// Fixtures
// ============================================================================

struct Farm {
    engine: ConfirmationWorkflow,
    now: DateTime<Utc>,
    admin: Principal,
    manager: Principal,
    doctor: Principal,
    worker: Principal,
    other_worker: Principal,
    seller: Principal,
    house: ChickenHouse,
}

impl Farm {
    fn new() -> Self {
        let now = Utc::now();
        let worker = Principal::new(Uuid::new_v4(), Role::Worker);
        Self {
            engine: ConfirmationWorkflow::new(),
            now,
            admin: Principal::new(Uuid::new_v4(), Role::Admin),
            manager: Principal::new(Uuid::new_v4(), Role::StockManager),
            doctor: Principal::new(Uuid::new_v4(), Role::Doctor),
            worker,
            other_worker: Principal::new(Uuid::new_v4(), Role::Worker),
            seller: Principal::new(Uuid::new_v4(), Role::SalesManager),
            house: ChickenHouse {
                id: Uuid::new_v4(),
                name: "House A".to_string(),
                location: None,
                capacity: 500,
                current_chicken_count: 100,
                worker_id: Some(worker.id),
                is_active: true,
                created_at: now,
                updated_at: now,
            },
        }
    }

    fn create(
        &self,
        kind: TransactionKind,
        quantity: i64,
        actor: &Principal,
        ledger: Option<&mut LedgerEntry>,
    ) -> Result<InventoryTransaction, InventoryError> {
        let draft = TransactionDraft::new(kind, Decimal::from(quantity));
        self.engine
            .originate(draft, actor, ledger, Some(&self.house), self.now)
            .map(|origination| origination.transaction)
    }

    fn confirm(
        &self,
        transaction: &mut InventoryTransaction,
        slot: ConfirmationSlot,
        actor: &Principal,
        target: EffectTarget<'_>,
    ) -> Result<bool, InventoryError> {
        self.engine
            .confirm(transaction, slot, actor, None, target, self.now)
            .map(|outcome| outcome.effect.is_some())
    }
}

fn ledger(kind: ResourceKind, on_hand: i64) -> LedgerEntry {
    LedgerEntry {
        id: Uuid::new_v4(),
        resource_kind: kind,
        resource_id: (kind != ResourceKind::Eggs).then(Uuid::new_v4),
        on_hand_quantity: Decimal::from(on_hand),
        rejected_quantity: 0,
        last_updated: Utc::now(),
    }
}

/// A sales manager's own egg ledger
fn seller_ledger(owner: &Principal, on_hand: i64) -> LedgerEntry {
    LedgerEntry {
        resource_id: Some(owner.id),
        ..ledger(ResourceKind::Eggs, on_hand)
    }
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[cfg(test)]
mod scenario_tests {
    use super::*;

    /// Food distribution of 4 sacks from 10: nothing moves until the
    /// receiving worker confirms
    #[test]
    fn test_food_distribution_applies_on_worker_confirmation() {
        let farm = Farm::new();
        let mut food = ledger(ResourceKind::Food, 10);

        let mut tx = farm
            .create(TransactionKind::FoodDistribution, 4, &farm.manager, Some(&mut food))
            .unwrap();
        assert_eq!(tx.assigned_worker_id, Some(farm.worker.id));
        assert_eq!(food.on_hand_quantity, Decimal::from(10));
        assert_eq!(tx.status(), TransactionStatus::Pending);

        let applied = farm
            .confirm(&mut tx, ConfirmationSlot::Worker, &farm.worker, EffectTarget::Ledger(&mut food))
            .unwrap();
        assert!(applied);
        assert_eq!(food.on_hand_quantity, Decimal::from(6));
        assert_eq!(tx.status(), TransactionStatus::Applied);
        assert!(tx.applied_at.is_some());
    }

    /// Medicine distribution needs the doctor and the worker, in any order
    #[test]
    fn test_medicine_distribution_needs_both_confirmations() {
        let farm = Farm::new();
        let mut medicine = ledger(ResourceKind::Medicine, 5);

        let mut tx = farm
            .create(TransactionKind::MedicineDistribution, 5, &farm.manager, Some(&mut medicine))
            .unwrap();

        let applied = farm
            .confirm(&mut tx, ConfirmationSlot::Doctor, &farm.doctor, EffectTarget::Ledger(&mut medicine))
            .unwrap();
        assert!(!applied);
        assert_eq!(medicine.on_hand_quantity, Decimal::from(5));
        assert_eq!(tx.pending_slots(), vec![ConfirmationSlot::Worker]);

        let applied = farm
            .confirm(&mut tx, ConfirmationSlot::Worker, &farm.worker, EffectTarget::Ledger(&mut medicine))
            .unwrap();
        assert!(applied);
        assert_eq!(medicine.on_hand_quantity, Decimal::ZERO);
    }

    #[test]
    fn test_medicine_distribution_worker_first() {
        let farm = Farm::new();
        let mut medicine = ledger(ResourceKind::Medicine, 8);

        let mut tx = farm
            .create(TransactionKind::MedicineDistribution, 3, &farm.manager, Some(&mut medicine))
            .unwrap();

        assert!(!farm
            .confirm(&mut tx, ConfirmationSlot::Worker, &farm.worker, EffectTarget::Ledger(&mut medicine))
            .unwrap());
        assert!(farm
            .confirm(&mut tx, ConfirmationSlot::Doctor, &farm.doctor, EffectTarget::Ledger(&mut medicine))
            .unwrap());
        assert_eq!(medicine.on_hand_quantity, Decimal::from(5));
    }

    /// Egg collection credits the egg ledger once the stock manager confirms
    #[test]
    fn test_egg_collection_credits_good_and_rejected_eggs() {
        let farm = Farm::new();
        let mut eggs = ledger(ResourceKind::Eggs, 0);

        let mut draft = TransactionDraft::new(TransactionKind::EggCollection, Decimal::from(95));
        draft.rejected_quantity = 4;
        let mut tx = farm
            .engine
            .originate(draft, &farm.worker, Some(&mut eggs), Some(&farm.house), farm.now)
            .unwrap()
            .transaction;
        assert_eq!(eggs.on_hand_quantity, Decimal::ZERO);

        farm.confirm(&mut tx, ConfirmationSlot::StockManager, &farm.manager, EffectTarget::Ledger(&mut eggs))
            .unwrap();
        assert_eq!(eggs.on_hand_quantity, Decimal::from(95));
        assert_eq!(eggs.rejected_quantity, 4);
        assert_eq!(eggs.egg_trays().map(|t| (t.full_trays, t.loose_eggs)), Some((3, 5)));
    }

    /// Only the worker assigned to the house may record its eggs
    #[test]
    fn test_egg_collection_by_other_worker_is_rejected() {
        let farm = Farm::new();
        let mut eggs = ledger(ResourceKind::Eggs, 0);

        let err = farm
            .create(TransactionKind::EggCollection, 30, &farm.other_worker, Some(&mut eggs))
            .unwrap_err();
        assert!(matches!(err, InventoryError::RoleViolation { required: Role::Worker, .. }));
    }

    /// Purchases and sales need no confirmation
    #[test]
    fn test_purchases_and_sales_apply_on_create() {
        let farm = Farm::new();
        let mut food = ledger(ResourceKind::Food, 2);
        let mut eggs = ledger(ResourceKind::Eggs, 60);

        let draft = TransactionDraft::new(TransactionKind::FoodPurchase, Decimal::from(8));
        let origination = farm
            .engine
            .originate(draft, &farm.manager, Some(&mut food), None, farm.now)
            .unwrap();
        assert!(origination.effect.is_some());
        assert!(origination.transaction.effect_applied);
        assert_eq!(food.on_hand_quantity, Decimal::from(10));

        let mut draft = TransactionDraft::new(TransactionKind::EggSale, Decimal::from(45));
        draft.unit_price = Some(Decimal::new(25, 2));
        let sale = farm
            .engine
            .originate(draft, &farm.manager, Some(&mut eggs), None, farm.now)
            .unwrap()
            .transaction;
        assert_eq!(eggs.on_hand_quantity, Decimal::from(15));
        assert_eq!(sale.total_price, Some(Decimal::new(1125, 2)));
    }

    #[test]
    fn test_egg_sale_beyond_stock_is_rejected() {
        let farm = Farm::new();
        let mut eggs = ledger(ResourceKind::Eggs, 20);

        let draft = TransactionDraft::new(TransactionKind::EggSale, Decimal::from(21));
        let err = farm
            .engine
            .originate(draft, &farm.manager, Some(&mut eggs), None, farm.now)
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(eggs.on_hand_quantity, Decimal::from(20));
    }

    /// Death records reduce the flock on doctor confirmation, floored at 0
    #[test]
    fn test_death_record_floors_chicken_count_at_zero() {
        let mut farm = Farm::new();
        farm.house.current_chicken_count = 3;

        let mut tx = farm
            .create(TransactionKind::ChickenDeathRecord, 5, &farm.worker, None)
            .unwrap();
        assert_eq!(tx.ledger_id, None);

        let mut house = farm.house.clone();
        let applied = farm
            .confirm(&mut tx, ConfirmationSlot::Doctor, &farm.doctor, EffectTarget::House(&mut house))
            .unwrap();
        assert!(applied);
        assert_eq!(house.current_chicken_count, 0);
    }

    /// A worker confirmation from someone else is a role violation
    #[test]
    fn test_wrong_worker_cannot_confirm_distribution() {
        let farm = Farm::new();
        let mut food = ledger(ResourceKind::Food, 10);

        let mut tx = farm
            .create(TransactionKind::FoodDistribution, 4, &farm.manager, Some(&mut food))
            .unwrap();
        let before = tx.clone();

        let err = farm
            .confirm(&mut tx, ConfirmationSlot::Worker, &farm.other_worker, EffectTarget::Ledger(&mut food))
            .unwrap_err();
        assert!(matches!(err, InventoryError::RoleViolation { .. }));
        assert_eq!(tx, before);
        assert_eq!(food.on_hand_quantity, Decimal::from(10));
    }

    /// Admins hold no implicit confirmation rights
    #[test]
    fn test_admin_cannot_stand_in_for_stock_manager() {
        let farm = Farm::new();
        let mut eggs = ledger(ResourceKind::Eggs, 0);

        let mut tx = farm
            .create(TransactionKind::EggCollection, 30, &farm.worker, Some(&mut eggs))
            .unwrap();
        let err = farm
            .confirm(&mut tx, ConfirmationSlot::StockManager, &farm.admin, EffectTarget::Ledger(&mut eggs))
            .unwrap_err();
        assert!(matches!(err, InventoryError::RoleViolation { required: Role::StockManager, .. }));
    }

    #[test]
    fn test_second_confirmation_in_same_slot_is_rejected() {
        let farm = Farm::new();
        let mut medicine = ledger(ResourceKind::Medicine, 10);

        let mut tx = farm
            .create(TransactionKind::MedicineDistribution, 2, &farm.manager, Some(&mut medicine))
            .unwrap();
        farm.confirm(&mut tx, ConfirmationSlot::Doctor, &farm.doctor, EffectTarget::Ledger(&mut medicine))
            .unwrap();

        let err = farm
            .confirm(&mut tx, ConfirmationSlot::Doctor, &farm.doctor, EffectTarget::Ledger(&mut medicine))
            .unwrap_err();
        assert!(matches!(err, InventoryError::AlreadyConfirmed(_)));
        assert_eq!(tx.confirmations.len(), 1);
    }

    #[test]
    fn test_slot_outside_policy_is_rejected() {
        let farm = Farm::new();
        let mut food = ledger(ResourceKind::Food, 10);

        let mut tx = farm
            .create(TransactionKind::FoodDistribution, 1, &farm.manager, Some(&mut food))
            .unwrap();
        let err = farm
            .confirm(&mut tx, ConfirmationSlot::Doctor, &farm.doctor, EffectTarget::Ledger(&mut food))
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation { .. }));
    }

    /// Stock consumed between creation and confirmation makes the final
    /// confirmation fail without recording it
    #[test]
    fn test_final_confirmation_rechecks_stock() {
        let farm = Farm::new();
        let mut food = ledger(ResourceKind::Food, 5);

        let mut first = farm
            .create(TransactionKind::FoodDistribution, 4, &farm.manager, Some(&mut food))
            .unwrap();
        let mut second = farm
            .create(TransactionKind::FoodDistribution, 3, &farm.manager, Some(&mut food))
            .unwrap();

        assert!(farm
            .confirm(&mut first, ConfirmationSlot::Worker, &farm.worker, EffectTarget::Ledger(&mut food))
            .unwrap());
        assert_eq!(food.on_hand_quantity, Decimal::from(1));

        let err = farm
            .confirm(&mut second, ConfirmationSlot::Worker, &farm.worker, EffectTarget::Ledger(&mut food))
            .unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientInventory { .. }));
        assert!(second.confirmations.is_empty());
        assert!(!second.effect_applied);
        assert_eq!(food.on_hand_quantity, Decimal::from(1));
    }

    #[test]
    fn test_distribution_to_unstaffed_house_is_rejected() {
        let mut farm = Farm::new();
        farm.house.worker_id = None;
        let mut food = ledger(ResourceKind::Food, 10);

        let err = farm
            .create(TransactionKind::FoodDistribution, 1, &farm.manager, Some(&mut food))
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation { .. }));
    }

    #[test]
    fn test_wrong_originator_is_rejected() {
        let farm = Farm::new();
        let mut food = ledger(ResourceKind::Food, 10);

        for actor in [&farm.worker, &farm.doctor, &farm.admin] {
            let err = farm
                .create(TransactionKind::FoodDistribution, 1, actor, Some(&mut food))
                .unwrap_err();
            assert!(matches!(err, InventoryError::RoleViolation { required: Role::StockManager, .. }));
        }
    }

    /// A rejected-egg count too large for the ledger fails the confirmation
    /// instead of wrapping
    #[test]
    fn test_rejected_egg_overflow_is_a_validation_error() {
        let farm = Farm::new();
        let mut eggs = ledger(ResourceKind::Eggs, 0);
        eggs.rejected_quantity = 1;

        let mut draft = TransactionDraft::new(TransactionKind::EggCollection, Decimal::from(30));
        draft.rejected_quantity = i64::MAX;
        let mut tx = farm
            .engine
            .originate(draft, &farm.worker, Some(&mut eggs), Some(&farm.house), farm.now)
            .unwrap()
            .transaction;

        let before = eggs.clone();
        let err = farm
            .confirm(&mut tx, ConfirmationSlot::StockManager, &farm.manager, EffectTarget::Ledger(&mut eggs))
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation { .. }));
        assert_eq!(eggs, before);
        assert!(tx.confirmations.is_empty());
        assert!(!tx.effect_applied);
    }

    #[test]
    fn test_quantity_beyond_ledger_range_is_rejected() {
        let farm = Farm::new();
        let mut food = ledger(ResourceKind::Food, 0);

        let draft = TransactionDraft::new(TransactionKind::FoodPurchase, dec("1000000000000"));
        let err = farm
            .engine
            .originate(draft, &farm.manager, Some(&mut food), None, farm.now)
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation { .. }));
        assert_eq!(food.on_hand_quantity, Decimal::ZERO);
    }

    /// Medicine quantities are stored to two decimal places; finer amounts
    /// are refused rather than rounded away
    #[test]
    fn test_medicine_quantity_limited_to_two_decimal_places() {
        let farm = Farm::new();
        let mut medicine = ledger(ResourceKind::Medicine, 0);

        for quantity in ["0.004", "1.005"] {
            let draft = TransactionDraft::new(TransactionKind::MedicinePurchase, dec(quantity));
            let err = farm
                .engine
                .originate(draft, &farm.manager, Some(&mut medicine), None, farm.now)
                .unwrap_err();
            assert!(matches!(err, InventoryError::Validation { ref field, .. } if field == "quantity"));
        }
        assert_eq!(medicine.on_hand_quantity, Decimal::ZERO);

        let mut draft = TransactionDraft::new(TransactionKind::MedicinePurchase, dec("1.25"));
        draft.unit_price = Some(dec("0.3333"));
        let purchase = farm
            .engine
            .originate(draft, &farm.manager, Some(&mut medicine), None, farm.now)
            .unwrap()
            .transaction;
        assert_eq!(medicine.on_hand_quantity, dec("1.25"));
        assert_eq!(purchase.total_price, Some(dec("0.42")));
    }

    #[test]
    fn test_unit_price_beyond_four_decimal_places_is_rejected() {
        let farm = Farm::new();
        let mut food = ledger(ResourceKind::Food, 0);

        let mut draft = TransactionDraft::new(TransactionKind::FoodPurchase, Decimal::from(2));
        draft.unit_price = Some(dec("12.00005"));
        let err = farm
            .engine
            .originate(draft, &farm.manager, Some(&mut food), None, farm.now)
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation { ref field, .. } if field == "unit_price"));
    }

    /// Eggs handed to a sales manager leave the main stock and land in theirs
    #[test]
    fn test_egg_distribution_transfers_to_sales_manager() {
        let farm = Farm::new();
        let mut main = ledger(ResourceKind::Eggs, 300);
        let mut outlet = seller_ledger(&farm.seller, 0);

        let draft = TransactionDraft::new(TransactionKind::EggDistribution, Decimal::from(120));
        let origination = farm
            .engine
            .originate_transfer(draft, &farm.manager, &mut main, &mut outlet, farm.now)
            .unwrap();

        assert_eq!(main.on_hand_quantity, Decimal::from(180));
        assert_eq!(outlet.on_hand_quantity, Decimal::from(120));
        assert!(origination.transaction.effect_applied);
        assert_eq!(origination.transaction.ledger_id, Some(main.id));
        assert_eq!(origination.transaction.destination_ledger_id, Some(outlet.id));
        assert_eq!(
            origination.effect,
            Some(AppliedEffect::Transfer {
                from_ledger_id: main.id,
                to_ledger_id: outlet.id,
                quantity: Decimal::from(120),
            })
        );
    }

    #[test]
    fn test_egg_distribution_beyond_main_stock_moves_nothing() {
        let farm = Farm::new();
        let mut main = ledger(ResourceKind::Eggs, 50);
        let mut outlet = seller_ledger(&farm.seller, 10);

        let draft = TransactionDraft::new(TransactionKind::EggDistribution, Decimal::from(51));
        let err = farm
            .engine
            .originate_transfer(draft, &farm.manager, &mut main, &mut outlet, farm.now)
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(main.on_hand_quantity, Decimal::from(50));
        assert_eq!(outlet.on_hand_quantity, Decimal::from(10));
    }

    #[test]
    fn test_egg_distribution_needs_stock_manager_and_a_seller_ledger() {
        let farm = Farm::new();
        let mut main = ledger(ResourceKind::Eggs, 50);
        let mut outlet = seller_ledger(&farm.seller, 0);

        let draft = TransactionDraft::new(TransactionKind::EggDistribution, Decimal::from(5));
        let err = farm
            .engine
            .originate_transfer(draft.clone(), &farm.seller, &mut main, &mut outlet, farm.now)
            .unwrap_err();
        assert!(matches!(err, InventoryError::RoleViolation { required: Role::StockManager, .. }));

        let mut food = ledger(ResourceKind::Food, 0);
        let err = farm
            .engine
            .originate_transfer(draft.clone(), &farm.manager, &mut main, &mut food, farm.now)
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation { .. }));

        let err = farm
            .engine
            .originate(draft, &farm.manager, Some(&mut main), None, farm.now)
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation { .. }));
        assert_eq!(main.on_hand_quantity, Decimal::from(50));
    }

    /// Sales managers sell from their own stock only
    #[test]
    fn test_sales_manager_sells_from_own_ledger() {
        let farm = Farm::new();
        let mut outlet = seller_ledger(&farm.seller, 40);
        let mut main = ledger(ResourceKind::Eggs, 40);

        let mut draft = TransactionDraft::new(TransactionKind::EggSale, Decimal::from(30));
        draft.unit_price = Some(dec("0.5"));
        farm.engine
            .originate(draft.clone(), &farm.seller, Some(&mut outlet), None, farm.now)
            .unwrap();
        assert_eq!(outlet.on_hand_quantity, Decimal::from(10));

        let err = farm
            .engine
            .originate(draft.clone(), &farm.seller, Some(&mut main), None, farm.now)
            .unwrap_err();
        assert!(matches!(err, InventoryError::RoleViolation { required: Role::SalesManager, .. }));

        let other = Principal::new(Uuid::new_v4(), Role::SalesManager);
        let err = farm
            .engine
            .originate(draft.clone(), &other, Some(&mut outlet), None, farm.now)
            .unwrap_err();
        assert!(matches!(err, InventoryError::RoleViolation { .. }));

        let err = farm
            .engine
            .originate(draft, &farm.manager, Some(&mut outlet), None, farm.now)
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation { .. }));
        assert_eq!(outlet.on_hand_quantity, Decimal::from(10));
        assert_eq!(main.on_hand_quantity, Decimal::from(40));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Whatever mix of purchases and distributions runs, the food ledger
        /// never goes negative and equals bought minus delivered
        #[test]
        fn prop_food_ledger_never_negative(
            start in 0i64..20,
            moves in prop::collection::vec((any::<bool>(), 1i64..10), 1..30)
        ) {
            let farm = Farm::new();
            let mut food = ledger(ResourceKind::Food, start);
            let mut expected = start;

            for (purchase, sacks) in moves {
                if purchase {
                    let draft = TransactionDraft::new(TransactionKind::FoodPurchase, Decimal::from(sacks));
                    farm.engine
                        .originate(draft, &farm.manager, Some(&mut food), None, farm.now)
                        .unwrap();
                    expected += sacks;
                } else if let Ok(mut tx) =
                    farm.create(TransactionKind::FoodDistribution, sacks, &farm.manager, Some(&mut food))
                {
                    let result = farm.confirm(
                        &mut tx,
                        ConfirmationSlot::Worker,
                        &farm.worker,
                        EffectTarget::Ledger(&mut food),
                    );
                    prop_assert!(result.is_ok());
                    expected -= sacks;
                } else {
                    prop_assert!(expected < sacks);
                }

                prop_assert!(food.on_hand_quantity >= Decimal::ZERO);
                prop_assert_eq!(food.on_hand_quantity, Decimal::from(expected));
            }
        }

        /// Replaying confirmations never applies an effect twice
        #[test]
        fn prop_effect_applies_exactly_once(
            stock in 10i64..100,
            quantity in 1i64..10,
            replays in 1usize..5
        ) {
            let farm = Farm::new();
            let mut medicine = ledger(ResourceKind::Medicine, stock);
            let mut tx = farm
                .create(TransactionKind::MedicineDistribution, quantity, &farm.manager, Some(&mut medicine))
                .unwrap();

            let mut applications = 0;
            for _ in 0..replays {
                for (slot, actor) in [
                    (ConfirmationSlot::Doctor, &farm.doctor),
                    (ConfirmationSlot::Worker, &farm.worker),
                ] {
                    if let Ok(true) = farm.confirm(&mut tx, slot, actor, EffectTarget::Ledger(&mut medicine)) {
                        applications += 1;
                    }
                }
            }

            prop_assert_eq!(applications, 1);
            prop_assert_eq!(medicine.on_hand_quantity, Decimal::from(stock - quantity));
            prop_assert_eq!(tx.confirmations.len(), 2);
        }

        /// Death records never drive the flock below zero
        #[test]
        fn prop_chicken_count_floored_at_zero(
            count in 0i32..200,
            dead in 1i64..400
        ) {
            let mut farm = Farm::new();
            farm.house.current_chicken_count = count;

            let mut tx = farm
                .create(TransactionKind::ChickenDeathRecord, dead, &farm.worker, None)
                .unwrap();
            let mut house = farm.house.clone();
            farm.confirm(&mut tx, ConfirmationSlot::Doctor, &farm.doctor, EffectTarget::House(&mut house))
                .unwrap();

            let expected = (i64::from(count) - dead).max(0);
            prop_assert_eq!(i64::from(house.current_chicken_count), expected);
        }
    }
}
