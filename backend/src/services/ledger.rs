//! Ledger persistence
//!
//! The persisted half of the ledger mutation primitive: row locks for the
//! workflow and a guarded read-modify-write that never lets a quantity go
//! negative, even if a caller skipped the lock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{LedgerDelta, LedgerEntry, ResourceKind};

/// Database row for a ledger entry
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LedgerRow {
    pub id: Uuid,
    pub resource_kind: String,
    pub resource_id: Option<Uuid>,
    pub on_hand_quantity: Decimal,
    pub rejected_quantity: i64,
    pub last_updated: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = AppError;

    fn try_from(row: LedgerRow) -> Result<Self, Self::Error> {
        Ok(LedgerEntry {
            id: row.id,
            resource_kind: row.resource_kind.parse()?,
            resource_id: row.resource_id,
            on_hand_quantity: row.on_hand_quantity,
            rejected_quantity: row.rejected_quantity,
            last_updated: row.last_updated,
        })
    }
}

const LEDGER_COLUMNS: &str =
    "id, resource_kind, resource_id, on_hand_quantity, rejected_quantity, last_updated";

/// Label used in not-found errors for a resource kind
fn resource_label(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Eggs => "Egg ledger",
        ResourceKind::Food => "Food type",
        ResourceKind::Medicine => "Medicine",
    }
}

/// Row-level access to `ledger_entries`
pub struct LedgerStore;

impl LedgerStore {
    /// Lock a ledger entry by id for the rest of the database transaction
    pub async fn lock_entry<'e, E>(executor: E, ledger_id: Uuid) -> AppResult<LedgerEntry>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, LedgerRow>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries WHERE id = $1 FOR UPDATE"
        ))
        .bind(ledger_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound("Ledger entry".to_string()))?;

        row.try_into()
    }

    /// Lock the singleton egg ledger
    pub async fn lock_egg_ledger<'e, E>(executor: E) -> AppResult<LedgerEntry>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, LedgerRow>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries \
             WHERE resource_kind = 'eggs' AND resource_id IS NULL FOR UPDATE"
        ))
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::Internal("Egg ledger has not been provisioned".to_string()))?;

        row.try_into()
    }

    /// Lock the ledger of a food type, a medicine, or a sales manager's eggs
    pub async fn lock_resource_entry<'e, E>(
        executor: E,
        kind: ResourceKind,
        resource_id: Uuid,
    ) -> AppResult<LedgerEntry>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, LedgerRow>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries \
             WHERE resource_kind = $1 AND resource_id = $2 FOR UPDATE"
        ))
        .bind(kind.as_str())
        .bind(resource_id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::NotFound(resource_label(kind).to_string()))?;

        row.try_into()
    }

    /// Create the ledger row for a newly catalogued resource or sales manager
    pub async fn provision<'e, E>(
        executor: E,
        kind: ResourceKind,
        resource_id: Uuid,
    ) -> AppResult<LedgerEntry>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, LedgerRow>(&format!(
            "INSERT INTO ledger_entries (resource_kind, resource_id) VALUES ($1, $2) \
             RETURNING {LEDGER_COLUMNS}"
        ))
        .bind(kind.as_str())
        .bind(resource_id)
        .fetch_one(executor)
        .await?;

        row.try_into()
    }

    /// Apply a signed delta as one atomic read-modify-write against the
    /// latest committed value. Fails with `InsufficientInventory` (and
    /// changes nothing) if either quantity would go negative.
    pub async fn apply_delta(
        conn: &mut PgConnection,
        ledger_id: Uuid,
        delta: &LedgerDelta,
        now: DateTime<Utc>,
    ) -> AppResult<LedgerEntry> {
        let updated = sqlx::query_as::<_, LedgerRow>(&format!(
            r#"
            UPDATE ledger_entries
            SET on_hand_quantity = on_hand_quantity + $2,
                rejected_quantity = rejected_quantity + $3,
                last_updated = $4
            WHERE id = $1
              AND on_hand_quantity + $2 >= 0
              AND rejected_quantity + $3 >= 0
            RETURNING {LEDGER_COLUMNS}
            "#
        ))
        .bind(ledger_id)
        .bind(delta.on_hand)
        .bind(delta.rejected)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(row) = updated {
            return row.try_into();
        }

        // Nothing updated: either the row is gone or the guard refused.
        let current: LedgerEntry = sqlx::query_as::<_, LedgerRow>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries WHERE id = $1"
        ))
        .bind(ledger_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Ledger entry".to_string()))?
        .try_into()?;

        match current.check_delta(delta) {
            Err(err) => Err(err.into()),
            Ok(()) => Err(AppError::Internal(format!(
                "Ledger {} refused a delta it can cover",
                ledger_id
            ))),
        }
    }
}
