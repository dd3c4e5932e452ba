//! HTTP handlers for users and chicken houses

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{ChickenHouse, User};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::farm::{
    AddChickensInput, AssignWorkerInput, CreateHouseInput, CreateUserInput, FarmService,
    UserFilter,
};
use crate::AppState;

/// Register a user
pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    let service = FarmService::new(state.db);
    let user = service.create_user(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// List users, optionally filtered by role
pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<Vec<User>>> {
    let service = FarmService::new(state.db);
    let users = service.list_users(&current_user.0, filter).await?;
    Ok(Json(users))
}

/// The authenticated caller's own account
pub async fn get_me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<User>> {
    let service = FarmService::new(state.db);
    let user = service.find_user(current_user.0.id).await?;
    Ok(Json(user))
}

/// Create a chicken house
pub async fn create_house(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateHouseInput>,
) -> AppResult<(StatusCode, Json<ChickenHouse>)> {
    let service = FarmService::new(state.db);
    let house = service.create_house(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(house)))
}

/// List chicken houses
pub async fn list_houses(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ChickenHouse>>> {
    let service = FarmService::new(state.db);
    let houses = service.list_houses(&current_user.0).await?;
    Ok(Json(houses))
}

/// Get a chicken house
pub async fn get_house(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(house_id): Path<Uuid>,
) -> AppResult<Json<ChickenHouse>> {
    let service = FarmService::new(state.db);
    let house = service.get_house(&current_user.0, house_id).await?;
    Ok(Json(house))
}

/// Assign (or clear) the worker responsible for a house
pub async fn assign_worker(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(house_id): Path<Uuid>,
    Json(input): Json<AssignWorkerInput>,
) -> AppResult<Json<ChickenHouse>> {
    let service = FarmService::new(state.db);
    let house = service
        .assign_worker(&current_user.0, house_id, input)
        .await?;
    Ok(Json(house))
}

/// Add chickens to a house
pub async fn add_chickens(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(house_id): Path<Uuid>,
    Json(input): Json<AddChickensInput>,
) -> AppResult<Json<ChickenHouse>> {
    let service = FarmService::new(state.db);
    let house = service
        .add_chickens(&current_user.0, house_id, input)
        .await?;
    Ok(Json(house))
}
