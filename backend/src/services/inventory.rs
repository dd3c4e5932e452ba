//! Inventory service for ledger snapshots, the stock summary and alerts

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::config::InventoryConfig;
use crate::error::{AppError, AppResult};
use crate::services::ledger::LedgerRow;
use shared::{require_any_role, DateRange, EggCount, LedgerEntry, Principal, ResourceKind, Role};

/// Roles that see stock levels across the farm
const STOCK_VIEWERS: &[Role] = &[Role::Admin, Role::StockManager];

/// Roles that may read ledgers. Sales managers only see their own eggs.
const LEDGER_READERS: &[Role] = &[
    Role::Admin,
    Role::StockManager,
    Role::Doctor,
    Role::Worker,
    Role::SalesManager,
];

/// Inventory service for read-side stock views
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
    thresholds: InventoryConfig,
}

/// A ledger entry with the name and unit of what it holds
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot {
    #[serde(flatten)]
    pub entry: LedgerEntry,
    pub resource_name: String,
    pub unit: String,
    /// Egg ledgers only: on-hand eggs as trays plus loose eggs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trays: Option<EggCount>,
}

/// Stock across every ledger plus outstanding work
#[derive(Debug, Clone, Serialize)]
pub struct InventorySummary {
    /// The main egg ledger
    pub eggs: Option<LedgerSnapshot>,
    /// Eggs held by each sales manager
    pub sales_stock: Vec<LedgerSnapshot>,
    pub food: Vec<LedgerSnapshot>,
    pub medicine: Vec<LedgerSnapshot>,
    pub pending_transactions: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowFood,
    MedicineExpiring,
    MedicineExpired,
}

/// A stock condition someone should act on
#[derive(Debug, Clone, Serialize)]
pub struct InventoryAlert {
    pub kind: AlertKind,
    pub resource_id: Option<Uuid>,
    pub title: String,
    pub message: String,
}

#[derive(Debug, FromRow)]
struct SnapshotRow {
    #[sqlx(flatten)]
    ledger: LedgerRow,
    resource_name: String,
    unit: String,
}

impl TryFrom<SnapshotRow> for LedgerSnapshot {
    type Error = AppError;

    fn try_from(row: SnapshotRow) -> Result<Self, Self::Error> {
        let entry: LedgerEntry = row.ledger.try_into()?;
        Ok(LedgerSnapshot {
            trays: entry.egg_trays(),
            entry,
            resource_name: row.resource_name,
            unit: row.unit,
        })
    }
}

/// A medicine purchase batch with an expiry date
#[derive(Debug, FromRow)]
struct ExpiringBatchRow {
    medicine_id: Uuid,
    medicine_name: String,
    quantity: Decimal,
    unit_of_measure: String,
    expiry_date: NaiveDate,
}

const SNAPSHOT_QUERY: &str = r#"
    SELECT l.id, l.resource_kind, l.resource_id, l.on_hand_quantity, l.rejected_quantity,
           l.last_updated,
           COALESCE(
               f.name,
               m.name,
               'Eggs (' || COALESCE(NULLIF(TRIM(u.first_name || ' ' || u.last_name), ''),
                                    u.phone_number) || ')',
               'Eggs'
           ) AS resource_name,
           CASE l.resource_kind
               WHEN 'eggs' THEN 'eggs'
               WHEN 'food' THEN 'sacks'
               ELSE COALESCE(m.unit_of_measure, 'units')
           END AS unit
    FROM ledger_entries l
    LEFT JOIN food_types f ON l.resource_kind = 'food' AND f.id = l.resource_id
    LEFT JOIN medicines m ON l.resource_kind = 'medicine' AND m.id = l.resource_id
    LEFT JOIN users u ON l.resource_kind = 'eggs' AND u.id = l.resource_id
"#;

impl InventoryService {
    pub fn new(db: PgPool, thresholds: InventoryConfig) -> Self {
        Self { db, thresholds }
    }

    /// Every ledger, eggs first, then food and medicine by name
    pub async fn list_ledgers(&self, actor: &Principal) -> AppResult<Vec<LedgerSnapshot>> {
        require_any_role(actor, LEDGER_READERS, "view stock levels")?;
        self.snapshots(None, seller_scope(actor)).await
    }

    /// Ledgers of one resource kind
    pub async fn list_ledgers_of(
        &self,
        actor: &Principal,
        kind: ResourceKind,
    ) -> AppResult<Vec<LedgerSnapshot>> {
        require_any_role(actor, LEDGER_READERS, "view stock levels")?;
        self.snapshots(Some(kind), seller_scope(actor)).await
    }

    pub async fn get_ledger(&self, actor: &Principal, ledger_id: Uuid) -> AppResult<LedgerSnapshot> {
        require_any_role(actor, LEDGER_READERS, "view stock levels")?;

        let row = sqlx::query_as::<_, SnapshotRow>(&format!(
            "{SNAPSHOT_QUERY} WHERE l.id = $1 \
             AND ($2::uuid IS NULL OR (l.resource_kind = 'eggs' AND l.resource_id = $2))"
        ))
        .bind(ledger_id)
        .bind(seller_scope(actor))
        .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Ledger entry".to_string()))?;

        row.try_into()
    }

    /// Snapshots of one kind (or all), limited to one owner's egg ledger
    /// when `owner` is set
    async fn snapshots(
        &self,
        kind: Option<ResourceKind>,
        owner: Option<Uuid>,
    ) -> AppResult<Vec<LedgerSnapshot>> {
        let rows = sqlx::query_as::<_, SnapshotRow>(&format!(
            "{SNAPSHOT_QUERY} WHERE ($1::text IS NULL OR l.resource_kind = $1) \
             AND ($2::uuid IS NULL OR (l.resource_kind = 'eggs' AND l.resource_id = $2)) \
             ORDER BY CASE l.resource_kind WHEN 'eggs' THEN 0 WHEN 'food' THEN 1 ELSE 2 END, \
             l.resource_id IS NOT NULL, resource_name"
        ))
        .bind(kind.map(|kind| kind.as_str()))
        .bind(owner)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(LedgerSnapshot::try_from).collect()
    }

    pub async fn summary(&self, actor: &Principal) -> AppResult<InventorySummary> {
        require_any_role(actor, STOCK_VIEWERS, "view the inventory summary")?;

        let snapshots = self.snapshots(None, None).await?;
        let pending_transactions: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM inventory_transactions WHERE effect_applied = FALSE",
        )
        .fetch_one(&self.db)
        .await?;

        let mut summary = InventorySummary {
            eggs: None,
            sales_stock: Vec::new(),
            food: Vec::new(),
            medicine: Vec::new(),
            pending_transactions,
        };
        for snapshot in snapshots {
            match snapshot.entry.resource_kind {
                ResourceKind::Eggs if snapshot.entry.resource_id.is_some() => {
                    summary.sales_stock.push(snapshot)
                }
                ResourceKind::Eggs => summary.eggs = Some(snapshot),
                ResourceKind::Food => summary.food.push(snapshot),
                ResourceKind::Medicine => summary.medicine.push(snapshot),
            }
        }
        Ok(summary)
    }

    /// Low food stock and medicine batches that expire soon (or already
    /// have) while the medicine is still in stock
    pub async fn alerts(&self, actor: &Principal) -> AppResult<Vec<InventoryAlert>> {
        require_any_role(actor, STOCK_VIEWERS, "view inventory alerts")?;

        let today = Utc::now().date_naive();
        let window = DateRange::window(today, self.thresholds.medicine_expiry_window_days);

        let food = self.snapshots(Some(ResourceKind::Food), None).await?;
        let mut alerts = low_food_alerts(&food, self.thresholds.low_food_threshold_sacks);

        let batches = sqlx::query_as::<_, ExpiringBatchRow>(
            r#"
            SELECT m.id AS medicine_id, m.name AS medicine_name, t.quantity,
                   m.unit_of_measure, t.expiry_date AS expiry_date
            FROM inventory_transactions t
            JOIN ledger_entries l ON l.id = t.ledger_id
            JOIN medicines m ON m.id = l.resource_id
            WHERE t.kind = 'medicine_purchase'
              AND t.expiry_date IS NOT NULL
              AND t.expiry_date <= $1
              AND l.on_hand_quantity > 0
            ORDER BY t.expiry_date
            "#,
        )
        .bind(window.end)
        .fetch_all(&self.db)
        .await?;

        alerts.extend(batches.iter().map(|batch| expiry_alert(batch, today)));

        tracing::debug!(count = alerts.len(), "Computed inventory alerts");
        Ok(alerts)
    }
}

/// The owner a sales manager's ledger reads are limited to
fn seller_scope(actor: &Principal) -> Option<Uuid> {
    (actor.role == Role::SalesManager).then_some(actor.id)
}

/// Alerts for food ledgers at or below `threshold` sacks
fn low_food_alerts(food: &[LedgerSnapshot], threshold: i64) -> Vec<InventoryAlert> {
    let threshold = Decimal::from(threshold);
    food.iter()
        .filter(|snapshot| snapshot.entry.on_hand_quantity <= threshold)
        .map(|snapshot| InventoryAlert {
            kind: AlertKind::LowFood,
            resource_id: snapshot.entry.resource_id,
            title: format!("Low stock: {}", snapshot.resource_name),
            message: format!(
                "{} has {} sacks left (alert at {} or fewer)",
                snapshot.resource_name,
                snapshot.entry.on_hand_quantity.normalize(),
                threshold
            ),
        })
        .collect()
}

fn expiry_alert(batch: &ExpiringBatchRow, today: NaiveDate) -> InventoryAlert {
    let days = (batch.expiry_date - today).num_days();
    let (kind, when) = match days {
        d if d < 0 => (AlertKind::MedicineExpired, format!("expired {} days ago", -d)),
        0 => (AlertKind::MedicineExpiring, "expires today".to_string()),
        1 => (AlertKind::MedicineExpiring, "expires tomorrow".to_string()),
        d => (AlertKind::MedicineExpiring, format!("expires in {} days", d)),
    };

    InventoryAlert {
        kind,
        resource_id: Some(batch.medicine_id),
        title: format!("{}: {}", batch.medicine_name, when),
        message: format!(
            "A batch of {} {} of {} {} ({})",
            batch.quantity.normalize(),
            batch.unit_of_measure,
            batch.medicine_name,
            when,
            batch.expiry_date
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn food(name: &str, sacks: i64) -> LedgerSnapshot {
        LedgerSnapshot {
            entry: LedgerEntry {
                id: Uuid::new_v4(),
                resource_kind: ResourceKind::Food,
                resource_id: Some(Uuid::new_v4()),
                on_hand_quantity: Decimal::from(sacks),
                rejected_quantity: 0,
                last_updated: Utc::now(),
            },
            resource_name: name.to_string(),
            unit: "sacks".to_string(),
            trays: None,
        }
    }

    fn batch(expiry_date: NaiveDate) -> ExpiringBatchRow {
        ExpiringBatchRow {
            medicine_id: Uuid::new_v4(),
            medicine_name: "Amprolium".to_string(),
            quantity: Decimal::from(5),
            unit_of_measure: "ml".to_string(),
            expiry_date,
        }
    }

    #[test]
    fn low_food_threshold_is_inclusive() {
        let ledgers = vec![food("starter", 5), food("grower", 6), food("complete", 0)];
        let alerts = low_food_alerts(&ledgers, 5);

        let names: Vec<_> = alerts.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(names, vec!["Low stock: starter", "Low stock: complete"]);
        assert!(alerts.iter().all(|a| a.kind == AlertKind::LowFood));
    }

    #[test]
    fn expiry_alerts_distinguish_expired_batches() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let expired = expiry_alert(&batch(today - Duration::days(3)), today);
        assert_eq!(expired.kind, AlertKind::MedicineExpired);
        assert!(expired.title.contains("expired 3 days ago"));

        let soon = expiry_alert(&batch(today + Duration::days(10)), today);
        assert_eq!(soon.kind, AlertKind::MedicineExpiring);
        assert!(soon.message.contains("expires in 10 days"));

        assert!(expiry_alert(&batch(today), today).title.ends_with("expires today"));
    }

    #[test]
    fn only_sales_managers_are_scoped_to_their_own_eggs() {
        let seller = Principal::new(Uuid::new_v4(), Role::SalesManager);
        assert_eq!(seller_scope(&seller), Some(seller.id));
        for role in [Role::Admin, Role::StockManager, Role::Doctor, Role::Worker] {
            assert_eq!(seller_scope(&Principal::new(Uuid::new_v4(), role)), None);
        }
    }

    #[test]
    fn default_thresholds() {
        let thresholds = InventoryConfig::default();
        assert_eq!(thresholds.low_food_threshold_sacks, 5);
        assert_eq!(thresholds.medicine_expiry_window_days, 30);
    }
}
