//! HTTP handlers for the food and medicine catalog

use axum::{extract::State, http::StatusCode, Json};
use shared::{FoodType, Medicine};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::catalog::{
    CatalogService, Catalogued, CreateFoodTypeInput, CreateMedicineInput,
};
use crate::AppState;

pub async fn create_food_type(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateFoodTypeInput>,
) -> AppResult<(StatusCode, Json<Catalogued<FoodType>>)> {
    let service = CatalogService::new(state.db);
    let food_type = service.create_food_type(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(food_type)))
}

pub async fn list_food_types(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<FoodType>>> {
    let service = CatalogService::new(state.db);
    let food_types = service.list_food_types(&current_user.0).await?;
    Ok(Json(food_types))
}

pub async fn create_medicine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMedicineInput>,
) -> AppResult<(StatusCode, Json<Catalogued<Medicine>>)> {
    let service = CatalogService::new(state.db);
    let medicine = service.create_medicine(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(medicine)))
}

pub async fn list_medicines(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Medicine>>> {
    let service = CatalogService::new(state.db);
    let medicines = service.list_medicines(&current_user.0).await?;
    Ok(Json(medicines))
}
