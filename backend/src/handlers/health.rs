//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub egg_ledger: bool,
}

/// Reports database connectivity and whether the egg ledger is provisioned
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let egg_ledger = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM ledger_entries WHERE resource_kind = 'eggs')",
    )
    .fetch_one(&state.db)
    .await;

    let (database, egg_ledger) = match egg_ledger {
        Ok(provisioned) => ("connected", provisioned),
        Err(err) => {
            tracing::warn!(error = %err, "Health check query failed");
            ("disconnected", false)
        }
    };

    Json(HealthResponse {
        status: if egg_ledger { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        egg_ledger,
    })
}
