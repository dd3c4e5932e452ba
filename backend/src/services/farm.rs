//! Farm service: user directory and chicken houses

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{Executor, FromRow, PgPool, Postgres};
use uuid::Uuid;
use validator::Validate;

use crate::error::{unique_violation, AppError, AppResult};
use crate::services::ledger::LedgerStore;
use shared::{
    require_any_role, require_role, validate_phone_number, ChickenHouse, Principal, ResourceKind,
    Role, User,
};

/// Roles that work on the farm floor and may read farm records
pub(crate) const STAFF: &[Role] = &[Role::Admin, Role::StockManager, Role::Doctor, Role::Worker];

/// Farm service for users and chicken houses
#[derive(Clone)]
pub struct FarmService {
    db: PgPool,
}

/// Input for registering a user
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(custom = "validate_phone_number")]
    pub phone_number: String,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    pub role: Role,
}

/// Input for creating a chicken house
#[derive(Debug, Deserialize, Validate)]
pub struct CreateHouseInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 255))]
    pub location: Option<String>,
    #[validate(range(min = 1))]
    pub capacity: i32,
    pub worker_id: Option<Uuid>,
}

/// Input for adding chickens to a house
#[derive(Debug, Deserialize, Validate)]
pub struct AddChickensInput {
    #[validate(range(min = 1))]
    pub number_of_chickens: i32,
}

/// Input for (re)assigning the worker responsible for a house
#[derive(Debug, Deserialize)]
pub struct AssignWorkerInput {
    pub worker_id: Option<Uuid>,
}

/// Query filter for the user directory
#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    phone_number: String,
    first_name: String,
    last_name: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            phone_number: row.phone_number,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct HouseRow {
    id: Uuid,
    name: String,
    location: Option<String>,
    capacity: i32,
    current_chicken_count: i32,
    worker_id: Option<Uuid>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<HouseRow> for ChickenHouse {
    fn from(row: HouseRow) -> Self {
        ChickenHouse {
            id: row.id,
            name: row.name,
            location: row.location,
            capacity: row.capacity,
            current_chicken_count: row.current_chicken_count,
            worker_id: row.worker_id,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const HOUSE_COLUMNS: &str = "id, name, location, capacity, current_chicken_count, worker_id, \
                             is_active, created_at, updated_at";

/// Lock a chicken house row for the rest of the database transaction
pub(crate) async fn lock_house<'e, E>(executor: E, house_id: Uuid) -> AppResult<ChickenHouse>
where
    E: Executor<'e, Database = Postgres>,
{
    let row = sqlx::query_as::<_, HouseRow>(&format!(
        "SELECT {HOUSE_COLUMNS} FROM chicken_houses WHERE id = $1 FOR UPDATE"
    ))
    .bind(house_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("Chicken house".to_string()))?;

    Ok(row.into())
}

/// Persist a new chicken count after the domain model has checked it
pub(crate) async fn store_chicken_count<'e, E>(
    executor: E,
    house: &ChickenHouse,
    now: DateTime<Utc>,
) -> AppResult<ChickenHouse>
where
    E: Executor<'e, Database = Postgres>,
{
    let row = sqlx::query_as::<_, HouseRow>(&format!(
        "UPDATE chicken_houses SET current_chicken_count = $2, updated_at = $3 \
         WHERE id = $1 RETURNING {HOUSE_COLUMNS}"
    ))
    .bind(house.id)
    .bind(house.current_chicken_count)
    .bind(now)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("Chicken house".to_string()))?;

    Ok(row.into())
}

impl FarmService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Register a user. Only admins manage the directory. A sales manager
    /// gets an empty egg ledger in the same transaction.
    pub async fn create_user(&self, actor: &Principal, input: CreateUserInput) -> AppResult<User> {
        require_role(actor, Role::Admin, "register users")?;
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (phone_number, first_name, last_name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, phone_number, first_name, last_name, role, created_at
            "#,
        )
        .bind(input.phone_number.trim())
        .bind(input.first_name.unwrap_or_default())
        .bind(input.last_name.unwrap_or_default())
        .bind(input.role.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, "phone_number"))?;

        let user: User = row.try_into()?;
        if user.role == Role::SalesManager {
            LedgerStore::provision(&mut *tx, ResourceKind::Eggs, user.id).await?;
        }
        tx.commit().await?;

        tracing::info!(user_id = %user.id, role = %user.role, "Registered user");
        Ok(user)
    }

    /// List users, optionally by role
    pub async fn list_users(&self, actor: &Principal, filter: UserFilter) -> AppResult<Vec<User>> {
        require_any_role(actor, &[Role::Admin, Role::StockManager], "list users")?;

        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, phone_number, first_name, last_name, role, created_at
            FROM users
            WHERE ($1::text IS NULL OR role = $1)
            ORDER BY last_name, first_name, phone_number
            "#,
        )
        .bind(filter.role.map(|role| role.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Look up the identity behind an authenticated caller
    pub async fn find_user(&self, user_id: Uuid) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, phone_number, first_name, last_name, role, created_at \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

        row.try_into()
    }

    /// Make sure `worker_id` names a user holding the Worker role
    async fn ensure_worker(&self, worker_id: Uuid) -> AppResult<()> {
        let worker = self.find_user(worker_id).await.map_err(|err| match err {
            AppError::NotFound(_) => AppError::NotFound("Worker".to_string()),
            other => other,
        })?;
        if worker.role != Role::Worker {
            return Err(AppError::Validation {
                field: "worker_id".to_string(),
                message: format!("Assigned user must be a worker, not {}", worker.role),
            });
        }
        Ok(())
    }

    /// Create a chicken house, optionally with its responsible worker
    pub async fn create_house(
        &self,
        actor: &Principal,
        input: CreateHouseInput,
    ) -> AppResult<ChickenHouse> {
        require_role(actor, Role::Admin, "create chicken houses")?;
        input.validate()?;

        if let Some(worker_id) = input.worker_id {
            self.ensure_worker(worker_id).await?;
        }

        let row = sqlx::query_as::<_, HouseRow>(&format!(
            "INSERT INTO chicken_houses (name, location, capacity, worker_id) \
             VALUES ($1, $2, $3, $4) RETURNING {HOUSE_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(&input.location)
        .bind(input.capacity)
        .bind(input.worker_id)
        .fetch_one(&self.db)
        .await?;

        let house = ChickenHouse::from(row);
        tracing::info!(house_id = %house.id, capacity = house.capacity, "Created chicken house");
        Ok(house)
    }

    /// Change the worker responsible for a house. Distributions already
    /// created keep the worker they were assigned to.
    pub async fn assign_worker(
        &self,
        actor: &Principal,
        house_id: Uuid,
        input: AssignWorkerInput,
    ) -> AppResult<ChickenHouse> {
        require_role(actor, Role::Admin, "assign workers")?;

        if let Some(worker_id) = input.worker_id {
            self.ensure_worker(worker_id).await?;
        }

        let row = sqlx::query_as::<_, HouseRow>(&format!(
            "UPDATE chicken_houses SET worker_id = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {HOUSE_COLUMNS}"
        ))
        .bind(house_id)
        .bind(input.worker_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Chicken house".to_string()))?;

        Ok(row.into())
    }

    /// Add chickens to a house. Additions beyond capacity are rejected.
    pub async fn add_chickens(
        &self,
        actor: &Principal,
        house_id: Uuid,
        input: AddChickensInput,
    ) -> AppResult<ChickenHouse> {
        require_role(actor, Role::Admin, "add chickens")?;
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let mut house = lock_house(&mut *tx, house_id).await?;
        house.add_chickens(input.number_of_chickens)?;
        let house = store_chicken_count(&mut *tx, &house, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!(
            house_id = %house.id,
            added = input.number_of_chickens,
            count = house.current_chicken_count,
            "Added chickens"
        );
        Ok(house)
    }

    /// List chicken houses. Workers only see the houses they look after.
    pub async fn list_houses(&self, actor: &Principal) -> AppResult<Vec<ChickenHouse>> {
        require_any_role(actor, STAFF, "list chicken houses")?;

        let worker_scope = (actor.role == Role::Worker).then_some(actor.id);
        let rows = sqlx::query_as::<_, HouseRow>(&format!(
            "SELECT {HOUSE_COLUMNS} FROM chicken_houses \
             WHERE ($1::uuid IS NULL OR worker_id = $1) ORDER BY name"
        ))
        .bind(worker_scope)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ChickenHouse::from).collect())
    }

    /// Get a single chicken house
    pub async fn get_house(&self, actor: &Principal, house_id: Uuid) -> AppResult<ChickenHouse> {
        require_any_role(actor, STAFF, "view chicken houses")?;

        let row = sqlx::query_as::<_, HouseRow>(&format!(
            "SELECT {HOUSE_COLUMNS} FROM chicken_houses WHERE id = $1"
        ))
        .bind(house_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Chicken house".to_string()))?;

        Ok(row.into())
    }
}
