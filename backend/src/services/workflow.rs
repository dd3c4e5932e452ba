//! Workflow service: creating and confirming inventory transactions
//!
//! Every call runs in one database transaction. Rows are locked in a fixed
//! order (transaction, then ledger or chicken house) and the in-memory
//! engine decides; the outcome is persisted only if the engine succeeds, so
//! a failed call leaves no trace.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::farm::{lock_house, store_chicken_count};
use crate::services::ledger::LedgerStore;
use shared::{
    policy, positive_decimal, require_any_role, AppliedEffect, Confirmation, ConfirmationSlot,
    ConfirmationWorkflow, EffectScope, EffectTarget, EggCount, InventoryError,
    InventoryTransaction, LedgerDelta, Principal, ResourceKind, Role, TransactionDraft,
    TransactionKind, TransactionStatus,
};

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 500;

/// Roles that may read transactions. Workers and sales managers only see
/// their own.
const READERS: &[Role] = &[
    Role::Admin,
    Role::StockManager,
    Role::Doctor,
    Role::Worker,
    Role::SalesManager,
];

/// Workflow service for inventory transactions
#[derive(Clone)]
pub struct WorkflowService {
    db: PgPool,
    engine: ConfirmationWorkflow,
}

// ============================================================================
// Inputs
// ============================================================================

/// A worker's egg collection, counted in trays plus loose eggs
#[derive(Debug, Deserialize, Validate)]
pub struct EggCollectionInput {
    pub chicken_house_id: Uuid,
    #[validate(range(min = 0, max = 1_000_000))]
    pub full_trays: i64,
    #[validate(range(min = 0, max = 29))]
    pub loose_eggs: Option<i64>,
    #[validate(range(min = 0, max = 30_000_000))]
    pub rejected_eggs: Option<i64>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FoodPurchaseInput {
    pub food_type_id: Uuid,
    #[validate(range(min = 1, max = 1_000_000))]
    pub sacks: i64,
    #[validate(custom = "positive_decimal")]
    pub price_per_sack: Decimal,
    #[validate(length(min = 1, max = 255))]
    pub supplier: String,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FoodDistributionInput {
    pub food_type_id: Uuid,
    pub chicken_house_id: Uuid,
    #[validate(range(min = 1, max = 1_000_000))]
    pub sacks: i64,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MedicinePurchaseInput {
    pub medicine_id: Uuid,
    #[validate(custom = "positive_decimal")]
    pub quantity: Decimal,
    #[validate(custom = "positive_decimal")]
    pub price_per_unit: Decimal,
    #[validate(length(min = 1, max = 255))]
    pub supplier: String,
    pub expiry_date: NaiveDate,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MedicineDistributionInput {
    pub medicine_id: Uuid,
    pub chicken_house_id: Uuid,
    #[validate(custom = "positive_decimal")]
    pub quantity: Decimal,
    /// Why the flock is being treated
    #[validate(length(max = 1000))]
    pub purpose: Option<String>,
}

/// Eggs handed from the main stock to a sales manager
#[derive(Debug, Deserialize, Validate)]
pub struct EggDistributionInput {
    pub sales_manager_id: Uuid,
    #[validate(range(min = 1, max = 30_000_000))]
    pub quantity: i64,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// A sale from the main egg stock, or from the seller's own stock when a
/// sales manager records it
#[derive(Debug, Deserialize, Validate)]
pub struct EggSaleInput {
    #[validate(range(min = 1, max = 30_000_000))]
    pub quantity: i64,
    #[validate(range(min = 0, max = 30_000_000))]
    pub rejected_eggs: Option<i64>,
    #[validate(custom = "positive_decimal")]
    pub price_per_egg: Decimal,
    #[validate(length(max = 255))]
    pub buyer: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChickenDeathInput {
    pub chicken_house_id: Uuid,
    #[validate(range(min = 1))]
    pub number_dead: i32,
    /// Suspected cause and other observations
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ConfirmInput {
    pub slot: ConfirmationSlot,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Query filter for listing transactions
#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub chicken_house_id: Option<Uuid>,
    /// Only transactions whose effect has not been applied yet
    #[serde(default)]
    pub pending: bool,
    pub limit: Option<i64>,
}

// ============================================================================
// Outputs
// ============================================================================

/// A transaction with its derived lifecycle state
#[derive(Debug, Clone, Serialize)]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: InventoryTransaction,
    pub status: TransactionStatus,
    pub pending_slots: Vec<ConfirmationSlot>,
}

impl From<InventoryTransaction> for TransactionView {
    fn from(transaction: InventoryTransaction) -> Self {
        Self {
            status: transaction.status(),
            pending_slots: transaction.pending_slots(),
            transaction,
        }
    }
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    kind: String,
    ledger_id: Option<Uuid>,
    destination_ledger_id: Option<Uuid>,
    chicken_house_id: Option<Uuid>,
    quantity: Decimal,
    rejected_quantity: i64,
    unit_price: Option<Decimal>,
    total_price: Option<Decimal>,
    counterparty: Option<String>,
    expiry_date: Option<NaiveDate>,
    notes: Option<String>,
    created_by: Uuid,
    assigned_worker_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    effect_applied: bool,
    applied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct ConfirmationRow {
    transaction_id: Uuid,
    slot: String,
    confirmed_by: Uuid,
    confirmed_at: DateTime<Utc>,
    notes: Option<String>,
}

impl TransactionRow {
    fn into_transaction(self, confirmations: Vec<Confirmation>) -> AppResult<InventoryTransaction> {
        Ok(InventoryTransaction {
            id: self.id,
            kind: self.kind.parse()?,
            ledger_id: self.ledger_id,
            destination_ledger_id: self.destination_ledger_id,
            chicken_house_id: self.chicken_house_id,
            quantity: self.quantity,
            rejected_quantity: self.rejected_quantity,
            unit_price: self.unit_price,
            total_price: self.total_price,
            counterparty: self.counterparty,
            expiry_date: self.expiry_date,
            notes: self.notes,
            created_by: self.created_by,
            assigned_worker_id: self.assigned_worker_id,
            created_at: self.created_at,
            confirmations,
            effect_applied: self.effect_applied,
            applied_at: self.applied_at,
        })
    }
}

const TRANSACTION_COLUMNS: &str = "id, kind, ledger_id, destination_ledger_id, chicken_house_id, \
    quantity, rejected_quantity, unit_price, total_price, counterparty, expiry_date, notes, \
    created_by, assigned_worker_id, created_at, effect_applied, applied_at";

/// Which ledger a new transaction draws on
enum LedgerRef {
    Eggs,
    Resource(ResourceKind, Uuid),
    None,
}

impl LedgerRef {
    /// The egg stock an actor sells from: their own as a sales manager,
    /// the main ledger otherwise
    fn egg_stock_of(actor: &Principal) -> Self {
        match actor.role {
            Role::SalesManager => LedgerRef::Resource(ResourceKind::Eggs, actor.id),
            _ => LedgerRef::Eggs,
        }
    }
}

// ============================================================================
// Persistence helpers
// ============================================================================

/// Attach confirmations to transaction rows, preserving row order
async fn with_confirmations(
    conn: &mut PgConnection,
    rows: Vec<TransactionRow>,
) -> AppResult<Vec<InventoryTransaction>> {
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let confirmation_rows = sqlx::query_as::<_, ConfirmationRow>(
        r#"
        SELECT transaction_id, slot, confirmed_by, confirmed_at, notes
        FROM transaction_confirmations
        WHERE transaction_id = ANY($1)
        ORDER BY confirmed_at
        "#,
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await?;

    let mut by_transaction: HashMap<Uuid, Vec<Confirmation>> = HashMap::new();
    for row in confirmation_rows {
        by_transaction
            .entry(row.transaction_id)
            .or_default()
            .push(Confirmation {
                slot: row.slot.parse()?,
                confirmed_by: row.confirmed_by,
                confirmed_at: row.confirmed_at,
                notes: row.notes,
            });
    }

    rows.into_iter()
        .map(|row| {
            let confirmations = by_transaction.remove(&row.id).unwrap_or_default();
            row.into_transaction(confirmations)
        })
        .collect()
}

async fn fetch_transaction(
    conn: &mut PgConnection,
    transaction_id: Uuid,
    for_update: bool,
) -> AppResult<InventoryTransaction> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let row = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM inventory_transactions WHERE id = $1{lock}"
    ))
    .bind(transaction_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Transaction".to_string()))?;

    with_confirmations(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Transaction".to_string()))
}

async fn insert_transaction(
    conn: &mut PgConnection,
    transaction: &InventoryTransaction,
) -> AppResult<()> {
    sqlx::query(&format!(
        "INSERT INTO inventory_transactions ({TRANSACTION_COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)"
    ))
    .bind(transaction.id)
    .bind(transaction.kind.as_str())
    .bind(transaction.ledger_id)
    .bind(transaction.destination_ledger_id)
    .bind(transaction.chicken_house_id)
    .bind(transaction.quantity)
    .bind(transaction.rejected_quantity)
    .bind(transaction.unit_price)
    .bind(transaction.total_price)
    .bind(&transaction.counterparty)
    .bind(transaction.expiry_date)
    .bind(&transaction.notes)
    .bind(transaction.created_by)
    .bind(transaction.assigned_worker_id)
    .bind(transaction.created_at)
    .bind(transaction.effect_applied)
    .bind(transaction.applied_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_confirmation(
    conn: &mut PgConnection,
    transaction_id: Uuid,
    confirmation: &Confirmation,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO transaction_confirmations (transaction_id, slot, confirmed_by, confirmed_at, notes)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (transaction_id, slot) DO NOTHING
        "#,
    )
    .bind(transaction_id)
    .bind(confirmation.slot.as_str())
    .bind(confirmation.confirmed_by)
    .bind(confirmation.confirmed_at)
    .bind(&confirmation.notes)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(InventoryError::AlreadyConfirmed(format!(
            "Transaction {} ({} slot)",
            transaction_id, confirmation.slot
        ))
        .into());
    }
    Ok(())
}

/// Flip the applied flag. Refuses if another writer already applied it.
async fn mark_applied(
    conn: &mut PgConnection,
    transaction_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE inventory_transactions SET effect_applied = TRUE, applied_at = $2 \
         WHERE id = $1 AND effect_applied = FALSE",
    )
    .bind(transaction_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() != 1 {
        return Err(AppError::Internal(format!(
            "Transaction {} effect was already applied",
            transaction_id
        )));
    }
    Ok(())
}

/// Write an effect the engine applied in memory
async fn persist_effect(
    conn: &mut PgConnection,
    effect: AppliedEffect,
    now: DateTime<Utc>,
) -> AppResult<()> {
    match effect {
        AppliedEffect::Ledger { ledger_id, delta } => {
            LedgerStore::apply_delta(conn, ledger_id, &delta, now).await?;
        }
        AppliedEffect::Transfer {
            from_ledger_id,
            to_ledger_id,
            quantity,
        } => {
            LedgerStore::apply_delta(conn, from_ledger_id, &LedgerDelta::debit(quantity), now)
                .await?;
            LedgerStore::apply_delta(conn, to_ledger_id, &LedgerDelta::credit(quantity), now)
                .await?;
        }
        AppliedEffect::House { .. } => {
            return Err(AppError::Internal(
                "Chicken house effects are stored with the house row".to_string(),
            ))
        }
    }
    Ok(())
}

/// Kinds with a confirmation slot `slot` can fill, as stored in the kind column
fn kinds_awaiting(slot: ConfirmationSlot) -> Vec<&'static str> {
    TransactionKind::ALL
        .into_iter()
        .filter(|kind| policy(*kind).confirmations.contains(&slot))
        .map(|kind| kind.as_str())
        .collect()
}

impl WorkflowService {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            engine: ConfirmationWorkflow::new(),
        }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    pub async fn record_egg_collection(
        &self,
        actor: &Principal,
        input: EggCollectionInput,
    ) -> AppResult<TransactionView> {
        input.validate()?;

        let eggs = EggCount::new(input.full_trays, input.loose_eggs.unwrap_or(0));
        let mut draft =
            TransactionDraft::new(TransactionKind::EggCollection, Decimal::from(eggs.total()?));
        draft.rejected_quantity = input.rejected_eggs.unwrap_or(0);
        draft.notes = input.notes;

        self.originate(actor, draft, LedgerRef::Eggs, Some(input.chicken_house_id))
            .await
    }

    pub async fn record_food_purchase(
        &self,
        actor: &Principal,
        input: FoodPurchaseInput,
    ) -> AppResult<TransactionView> {
        input.validate()?;

        let mut draft =
            TransactionDraft::new(TransactionKind::FoodPurchase, Decimal::from(input.sacks));
        draft.unit_price = Some(input.price_per_sack);
        draft.counterparty = Some(input.supplier.trim().to_string());
        draft.notes = input.notes;

        self.originate(
            actor,
            draft,
            LedgerRef::Resource(ResourceKind::Food, input.food_type_id),
            None,
        )
        .await
    }

    pub async fn distribute_food(
        &self,
        actor: &Principal,
        input: FoodDistributionInput,
    ) -> AppResult<TransactionView> {
        input.validate()?;

        let mut draft =
            TransactionDraft::new(TransactionKind::FoodDistribution, Decimal::from(input.sacks));
        draft.notes = input.notes;

        self.originate(
            actor,
            draft,
            LedgerRef::Resource(ResourceKind::Food, input.food_type_id),
            Some(input.chicken_house_id),
        )
        .await
    }

    pub async fn record_medicine_purchase(
        &self,
        actor: &Principal,
        input: MedicinePurchaseInput,
    ) -> AppResult<TransactionView> {
        input.validate()?;

        let mut draft = TransactionDraft::new(TransactionKind::MedicinePurchase, input.quantity);
        draft.unit_price = Some(input.price_per_unit);
        draft.counterparty = Some(input.supplier.trim().to_string());
        draft.expiry_date = Some(input.expiry_date);
        draft.notes = input.notes;

        self.originate(
            actor,
            draft,
            LedgerRef::Resource(ResourceKind::Medicine, input.medicine_id),
            None,
        )
        .await
    }

    pub async fn distribute_medicine(
        &self,
        actor: &Principal,
        input: MedicineDistributionInput,
    ) -> AppResult<TransactionView> {
        input.validate()?;

        let mut draft =
            TransactionDraft::new(TransactionKind::MedicineDistribution, input.quantity);
        draft.notes = input.purpose;

        self.originate(
            actor,
            draft,
            LedgerRef::Resource(ResourceKind::Medicine, input.medicine_id),
            Some(input.chicken_house_id),
        )
        .await
    }

    pub async fn record_egg_sale(
        &self,
        actor: &Principal,
        input: EggSaleInput,
    ) -> AppResult<TransactionView> {
        input.validate()?;

        let mut draft =
            TransactionDraft::new(TransactionKind::EggSale, Decimal::from(input.quantity));
        draft.rejected_quantity = input.rejected_eggs.unwrap_or(0);
        draft.unit_price = Some(input.price_per_egg);
        draft.counterparty = input.buyer;
        draft.notes = input.notes;

        self.originate(actor, draft, LedgerRef::egg_stock_of(actor), None)
            .await
    }

    /// Hand eggs from the main stock to a sales manager (stock manager).
    /// Applies on creation.
    pub async fn distribute_eggs(
        &self,
        actor: &Principal,
        input: EggDistributionInput,
    ) -> AppResult<TransactionView> {
        input.validate()?;

        let kind = TransactionKind::EggDistribution;
        let mut draft = TransactionDraft::new(kind, Decimal::from(input.quantity));
        draft.notes = input.notes;

        let mut tx = self.db.begin().await?;
        let mut source = LedgerStore::lock_egg_ledger(&mut *tx).await?;
        let mut destination =
            LedgerStore::lock_resource_entry(&mut *tx, ResourceKind::Eggs, input.sales_manager_id)
                .await
                .map_err(|err| match err {
                    AppError::NotFound(_) => AppError::NotFound("Sales manager".to_string()),
                    other => other,
                })?;

        let now = Utc::now();
        let origination = self
            .engine
            .originate_transfer(draft, actor, &mut source, &mut destination, now)
            .map_err(|err| rejected(kind, None, err))?;

        let transaction = origination.transaction;
        insert_transaction(&mut tx, &transaction).await?;
        if let Some(effect) = origination.effect {
            persist_effect(&mut tx, effect, now).await?;
        }
        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction.id,
            kind = %kind.as_str(),
            quantity = %transaction.quantity,
            sales_manager_id = %input.sales_manager_id,
            created_by = %actor.id,
            "Distributed eggs"
        );
        Ok(transaction.into())
    }

    pub async fn record_chicken_death(
        &self,
        actor: &Principal,
        input: ChickenDeathInput,
    ) -> AppResult<TransactionView> {
        input.validate()?;

        let mut draft = TransactionDraft::new(
            TransactionKind::ChickenDeathRecord,
            Decimal::from(input.number_dead),
        );
        draft.notes = input.notes;

        self.originate(actor, draft, LedgerRef::None, Some(input.chicken_house_id))
            .await
    }

    async fn originate(
        &self,
        actor: &Principal,
        draft: TransactionDraft,
        ledger_ref: LedgerRef,
        house_id: Option<Uuid>,
    ) -> AppResult<TransactionView> {
        let kind = draft.kind;
        let mut tx = self.db.begin().await?;

        let mut ledger = match ledger_ref {
            LedgerRef::Eggs => Some(LedgerStore::lock_egg_ledger(&mut *tx).await?),
            LedgerRef::Resource(resource, id) => {
                Some(LedgerStore::lock_resource_entry(&mut *tx, resource, id).await?)
            }
            LedgerRef::None => None,
        };
        let house = match house_id {
            Some(id) => Some(lock_house(&mut *tx, id).await?),
            None => None,
        };

        let now = Utc::now();
        let origination = self
            .engine
            .originate(draft, actor, ledger.as_mut(), house.as_ref(), now)
            .map_err(|err| rejected(kind, None, err))?;

        let transaction = origination.transaction;
        insert_transaction(&mut tx, &transaction).await?;
        if let Some(effect) = origination.effect {
            persist_effect(&mut tx, effect, now).await?;
        }
        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction.id,
            kind = %kind.as_str(),
            quantity = %transaction.quantity,
            applied = transaction.effect_applied,
            created_by = %actor.id,
            "Created transaction"
        );
        Ok(transaction.into())
    }

    // ========================================================================
    // Confirmation
    // ========================================================================

    /// Confirm a transaction in one slot, applying its effect if this was
    /// the last confirmation it needed.
    pub async fn confirm(
        &self,
        actor: &Principal,
        transaction_id: Uuid,
        input: ConfirmInput,
    ) -> AppResult<TransactionView> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let mut record = fetch_transaction(&mut tx, transaction_id, true).await?;
        let kind = record.kind;
        let now = Utc::now();

        let outcome = match policy(kind).scope {
            EffectScope::Ledger(_) => {
                let ledger_id = record.ledger_id.ok_or_else(|| {
                    AppError::Internal(format!("Transaction {} has no ledger", transaction_id))
                })?;
                let mut entry = LedgerStore::lock_entry(&mut *tx, ledger_id).await?;
                let outcome = self
                    .engine
                    .confirm(
                        &mut record,
                        input.slot,
                        actor,
                        input.notes,
                        EffectTarget::Ledger(&mut entry),
                        now,
                    )
                    .map_err(|err| rejected(kind, Some(transaction_id), err))?;
                if let Some(effect) = outcome.effect {
                    persist_effect(&mut tx, effect, now).await?;
                }
                outcome
            }
            EffectScope::ChickenHouse => {
                let house_id = record.chicken_house_id.ok_or_else(|| {
                    AppError::Internal(format!(
                        "Transaction {} has no chicken house",
                        transaction_id
                    ))
                })?;
                let mut house = lock_house(&mut *tx, house_id).await?;
                let outcome = self
                    .engine
                    .confirm(
                        &mut record,
                        input.slot,
                        actor,
                        input.notes,
                        EffectTarget::House(&mut house),
                        now,
                    )
                    .map_err(|err| rejected(kind, Some(transaction_id), err))?;
                if outcome.effect.is_some() {
                    store_chicken_count(&mut *tx, &house, now).await?;
                }
                outcome
            }
        };

        let confirmation = record.confirmation(outcome.slot).cloned().ok_or_else(|| {
            AppError::Internal(format!("Confirmation for {} was not recorded", transaction_id))
        })?;
        insert_confirmation(&mut tx, transaction_id, &confirmation).await?;
        if outcome.effect.is_some() {
            mark_applied(&mut tx, transaction_id, now).await?;
        }
        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction_id,
            kind = %kind.as_str(),
            slot = %outcome.slot.as_str(),
            confirmed_by = %actor.id,
            applied = outcome.effect.is_some(),
            "Confirmed transaction"
        );
        Ok(record.into())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn get_transaction(
        &self,
        actor: &Principal,
        transaction_id: Uuid,
    ) -> AppResult<TransactionView> {
        require_any_role(actor, READERS, "view transactions")?;

        let mut conn = self.db.acquire().await?;
        let transaction = fetch_transaction(&mut conn, transaction_id, false).await?;
        if let Some(owner) = own_scope(actor) {
            if !concerns(&mut conn, &transaction, owner).await? {
                return Err(AppError::NotFound("Transaction".to_string()));
            }
        }
        Ok(transaction.into())
    }

    /// List transactions, newest first. Workers only see records they
    /// created, were assigned, or that concern their houses; sales managers
    /// only their own sales and the eggs handed to them.
    pub async fn list_transactions(
        &self,
        actor: &Principal,
        filter: TransactionFilter,
    ) -> AppResult<Vec<TransactionView>> {
        require_any_role(actor, READERS, "list transactions")?;

        let limit = filter
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        let transactions = self
            .query_transactions(
                actor,
                filter.kind,
                filter.chicken_house_id,
                filter.pending,
                limit,
            )
            .await?;

        Ok(transactions.into_iter().map(TransactionView::from).collect())
    }

    /// Pending transactions waiting on a confirmation the actor could give,
    /// newest first. The slot, kind and assigned worker are matched in the
    /// query so older work is not crowded out by records the actor cannot
    /// confirm.
    pub async fn pending_for(&self, actor: &Principal) -> AppResult<Vec<TransactionView>> {
        require_any_role(actor, READERS, "list pending confirmations")?;

        let Some(slot) = ConfirmationSlot::for_role(actor.role) else {
            return Ok(Vec::new());
        };
        let kinds = kinds_awaiting(slot);
        let assigned_to = (slot == ConfirmationSlot::Worker).then_some(actor.id);

        let mut conn = self.db.acquire().await?;
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM inventory_transactions t
            WHERE effect_applied = FALSE
              AND kind = ANY($1)
              AND ($2::uuid IS NULL OR assigned_worker_id = $2)
              AND NOT EXISTS (
                  SELECT 1 FROM transaction_confirmations c
                  WHERE c.transaction_id = t.id AND c.slot = $3
              )
            ORDER BY created_at DESC
            LIMIT $4
            "#
        ))
        .bind(&kinds[..])
        .bind(assigned_to)
        .bind(slot.as_str())
        .bind(MAX_LIST_LIMIT)
        .fetch_all(&mut *conn)
        .await?;

        let transactions = with_confirmations(&mut conn, rows).await?;
        Ok(transactions
            .into_iter()
            .filter(|transaction| awaits(transaction, actor))
            .map(TransactionView::from)
            .collect())
    }

    async fn query_transactions(
        &self,
        actor: &Principal,
        kind: Option<TransactionKind>,
        chicken_house_id: Option<Uuid>,
        pending_only: bool,
        limit: i64,
    ) -> AppResult<Vec<InventoryTransaction>> {
        let scope = own_scope(actor);

        let mut conn = self.db.acquire().await?;
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS}
            FROM inventory_transactions
            WHERE ($1::text IS NULL OR kind = $1)
              AND ($2::uuid IS NULL OR chicken_house_id = $2)
              AND (NOT $3 OR effect_applied = FALSE)
              AND ($4::uuid IS NULL
                   OR created_by = $4
                   OR assigned_worker_id = $4
                   OR chicken_house_id IN (SELECT id FROM chicken_houses WHERE worker_id = $4)
                   OR destination_ledger_id IN (
                       SELECT id FROM ledger_entries
                       WHERE resource_kind = 'eggs' AND resource_id = $4))
            ORDER BY created_at DESC
            LIMIT $5
            "#
        ))
        .bind(kind.map(|kind| kind.as_str()))
        .bind(chicken_house_id)
        .bind(pending_only)
        .bind(scope)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        with_confirmations(&mut conn, rows).await
    }
}

/// The user whose records a scoped reader is limited to
fn own_scope(actor: &Principal) -> Option<Uuid> {
    matches!(actor.role, Role::Worker | Role::SalesManager).then_some(actor.id)
}

/// Whether a transaction concerns `user`, by the same rules as the list scope
async fn concerns(
    conn: &mut PgConnection,
    transaction: &InventoryTransaction,
    user: Uuid,
) -> AppResult<bool> {
    if transaction.created_by == user || transaction.assigned_worker_id == Some(user) {
        return Ok(true);
    }
    let related: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (SELECT 1 FROM chicken_houses WHERE id = $1 AND worker_id = $3)
            OR EXISTS (SELECT 1 FROM ledger_entries
                       WHERE id = $2 AND resource_kind = 'eggs' AND resource_id = $3)
        "#,
    )
    .bind(transaction.chicken_house_id)
    .bind(transaction.destination_ledger_id)
    .bind(user)
    .fetch_one(&mut *conn)
    .await?;
    Ok(related)
}

/// Whether `actor` could fill one of the transaction's open slots
fn awaits(transaction: &InventoryTransaction, actor: &Principal) -> bool {
    transaction.pending_slots().into_iter().any(|slot| {
        slot.required_role() == actor.role
            && (slot != ConfirmationSlot::Worker
                || transaction.assigned_worker_id == Some(actor.id))
    })
}

/// Log an engine rejection with its context and convert it for the response
fn rejected(kind: TransactionKind, transaction_id: Option<Uuid>, err: InventoryError) -> AppError {
    tracing::debug!(
        kind = %kind.as_str(),
        ?transaction_id,
        retryable = err.is_retryable(),
        error = %err,
        "Workflow engine rejected the call"
    );
    err.into()
}
