//! Catalog service for food types and medicines
//!
//! Every catalog item owns exactly one ledger entry, created in the same
//! database transaction as the item itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{unique_violation, AppResult};
use crate::services::farm::STAFF;
use crate::services::ledger::LedgerStore;
use shared::{
    require_any_role, require_role, FoodType, LedgerEntry, Medicine, Principal, ResourceKind, Role,
};

#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Input for adding a food type
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFoodTypeInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// Input for adding a medicine
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMedicineInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub unit_of_measure: String,
}

/// A newly catalogued item together with its (empty) ledger
#[derive(Debug, Clone, Serialize)]
pub struct Catalogued<T> {
    #[serde(flatten)]
    pub item: T,
    pub ledger: LedgerEntry,
}

#[derive(Debug, FromRow)]
struct FoodTypeRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<FoodTypeRow> for FoodType {
    fn from(row: FoodTypeRow) -> Self {
        FoodType {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MedicineRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    unit_of_measure: String,
    created_at: DateTime<Utc>,
}

impl From<MedicineRow> for Medicine {
    fn from(row: MedicineRow) -> Self {
        Medicine {
            id: row.id,
            name: row.name,
            description: row.description,
            unit_of_measure: row.unit_of_measure,
            created_at: row.created_at,
        }
    }
}

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_food_type(
        &self,
        actor: &Principal,
        input: CreateFoodTypeInput,
    ) -> AppResult<Catalogued<FoodType>> {
        require_role(actor, Role::Admin, "add food types")?;
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, FoodTypeRow>(
            r#"
            INSERT INTO food_types (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, "name"))?;

        let ledger = LedgerStore::provision(&mut *tx, ResourceKind::Food, row.id).await?;
        tx.commit().await?;

        tracing::info!(food_type_id = %row.id, name = %row.name, "Added food type");
        Ok(Catalogued {
            item: row.into(),
            ledger,
        })
    }

    pub async fn list_food_types(&self, actor: &Principal) -> AppResult<Vec<FoodType>> {
        require_any_role(actor, STAFF, "list food types")?;

        let rows = sqlx::query_as::<_, FoodTypeRow>(
            "SELECT id, name, description, created_at FROM food_types ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(FoodType::from).collect())
    }

    pub async fn create_medicine(
        &self,
        actor: &Principal,
        input: CreateMedicineInput,
    ) -> AppResult<Catalogued<Medicine>> {
        require_role(actor, Role::Admin, "add medicines")?;
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, MedicineRow>(
            r#"
            INSERT INTO medicines (name, description, unit_of_measure)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, unit_of_measure, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(input.unit_of_measure.trim())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, "name"))?;

        let ledger = LedgerStore::provision(&mut *tx, ResourceKind::Medicine, row.id).await?;
        tx.commit().await?;

        tracing::info!(medicine_id = %row.id, name = %row.name, "Added medicine");
        Ok(Catalogued {
            item: row.into(),
            ledger,
        })
    }

    pub async fn list_medicines(&self, actor: &Principal) -> AppResult<Vec<Medicine>> {
        require_any_role(actor, STAFF, "list medicines")?;

        let rows = sqlx::query_as::<_, MedicineRow>(
            "SELECT id, name, description, unit_of_measure, created_at FROM medicines ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Medicine::from).collect())
    }
}
