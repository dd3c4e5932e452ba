//! HTTP handlers for stock levels, the summary and alerts

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::ResourceKind;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::inventory::{
    InventoryAlert, InventoryService, InventorySummary, LedgerSnapshot,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub kind: Option<ResourceKind>,
}

fn service(state: AppState) -> InventoryService {
    InventoryService::new(state.db, state.config.inventory.clone())
}

/// List ledgers, optionally of one resource kind
pub async fn list_ledgers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<LedgerQuery>,
) -> AppResult<Json<Vec<LedgerSnapshot>>> {
    let service = service(state);
    let ledgers = match query.kind {
        Some(kind) => service.list_ledgers_of(&current_user.0, kind).await?,
        None => service.list_ledgers(&current_user.0).await?,
    };
    Ok(Json(ledgers))
}

/// Get one ledger
pub async fn get_ledger(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ledger_id): Path<Uuid>,
) -> AppResult<Json<LedgerSnapshot>> {
    let ledger = service(state).get_ledger(&current_user.0, ledger_id).await?;
    Ok(Json(ledger))
}

/// Stock on hand across every ledger
pub async fn get_inventory_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<InventorySummary>> {
    let summary = service(state).summary(&current_user.0).await?;
    Ok(Json(summary))
}

/// Low stock and expiring medicine
pub async fn get_inventory_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<InventoryAlert>>> {
    let alerts = service(state).alerts(&current_user.0).await?;
    Ok(Json(alerts))
}
