//! HTTP handlers for inventory transactions and their confirmations

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::workflow::{
    ChickenDeathInput, ConfirmInput, EggCollectionInput, EggDistributionInput, EggSaleInput,
    FoodDistributionInput, FoodPurchaseInput, MedicineDistributionInput, MedicinePurchaseInput,
    TransactionFilter, TransactionView, WorkflowService,
};
use crate::AppState;

type Created = AppResult<(StatusCode, Json<TransactionView>)>;

fn created(view: TransactionView) -> Created {
    Ok((StatusCode::CREATED, Json(view)))
}

/// Record an egg collection (worker)
pub async fn record_egg_collection(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<EggCollectionInput>,
) -> Created {
    let service = WorkflowService::new(state.db);
    created(service.record_egg_collection(&current_user.0, input).await?)
}

/// Record a food purchase (stock manager)
pub async fn record_food_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<FoodPurchaseInput>,
) -> Created {
    let service = WorkflowService::new(state.db);
    created(service.record_food_purchase(&current_user.0, input).await?)
}

/// Send food to a chicken house (stock manager)
pub async fn distribute_food(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<FoodDistributionInput>,
) -> Created {
    let service = WorkflowService::new(state.db);
    created(service.distribute_food(&current_user.0, input).await?)
}

/// Record a medicine purchase (stock manager)
pub async fn record_medicine_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<MedicinePurchaseInput>,
) -> Created {
    let service = WorkflowService::new(state.db);
    created(service.record_medicine_purchase(&current_user.0, input).await?)
}

/// Send medicine to a chicken house (stock manager)
pub async fn distribute_medicine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<MedicineDistributionInput>,
) -> Created {
    let service = WorkflowService::new(state.db);
    created(service.distribute_medicine(&current_user.0, input).await?)
}

/// Hand eggs to a sales manager (stock manager)
pub async fn distribute_eggs(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<EggDistributionInput>,
) -> Created {
    let service = WorkflowService::new(state.db);
    created(service.distribute_eggs(&current_user.0, input).await?)
}

/// Record an egg sale (stock manager, or a sales manager from their own stock)
pub async fn record_egg_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<EggSaleInput>,
) -> Created {
    let service = WorkflowService::new(state.db);
    created(service.record_egg_sale(&current_user.0, input).await?)
}

/// Report dead chickens (worker)
pub async fn record_chicken_death(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ChickenDeathInput>,
) -> Created {
    let service = WorkflowService::new(state.db);
    created(service.record_chicken_death(&current_user.0, input).await?)
}

/// Confirm a transaction in one slot
pub async fn confirm_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transaction_id): Path<Uuid>,
    Json(input): Json<ConfirmInput>,
) -> AppResult<Json<TransactionView>> {
    let service = WorkflowService::new(state.db);
    let transaction = service
        .confirm(&current_user.0, transaction_id, input)
        .await?;
    Ok(Json(transaction))
}

/// Get a transaction with its confirmations
pub async fn get_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<Json<TransactionView>> {
    let service = WorkflowService::new(state.db);
    let transaction = service
        .get_transaction(&current_user.0, transaction_id)
        .await?;
    Ok(Json(transaction))
}

/// List transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<TransactionFilter>,
) -> AppResult<Json<Vec<TransactionView>>> {
    let service = WorkflowService::new(state.db);
    let transactions = service.list_transactions(&current_user.0, filter).await?;
    Ok(Json(transactions))
}

/// Transactions waiting on the caller's confirmation
pub async fn list_pending_confirmations(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<TransactionView>>> {
    let service = WorkflowService::new(state.db);
    let transactions = service.pending_for(&current_user.0).await?;
    Ok(Json(transactions))
}
