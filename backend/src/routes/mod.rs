//! Route definitions for the poultry farm API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - user directory
        .nest("/users", user_routes(state.clone()))
        // Protected routes - chicken houses
        .nest("/houses", house_routes(state.clone()))
        // Protected routes - food and medicine catalog
        .nest("/catalog", catalog_routes(state.clone()))
        // Protected routes - stock levels
        .nest("/inventory", inventory_routes(state.clone()))
        // Protected routes - transactions and confirmations
        .nest("/transactions", transaction_routes(state))
}

/// User directory routes (protected)
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route("/me", get(handlers::get_me))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Chicken house routes (protected)
fn house_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_houses).post(handlers::create_house))
        .route("/:house_id", get(handlers::get_house))
        .route("/:house_id/worker", put(handlers::assign_worker))
        .route("/:house_id/chickens", post(handlers::add_chickens))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Catalog routes (protected)
fn catalog_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/food-types",
            get(handlers::list_food_types).post(handlers::create_food_type),
        )
        .route(
            "/medicines",
            get(handlers::list_medicines).post(handlers::create_medicine),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Inventory routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/ledgers", get(handlers::list_ledgers))
        .route("/ledgers/:ledger_id", get(handlers::get_ledger))
        .route("/summary", get(handlers::get_inventory_summary))
        .route("/alerts", get(handlers::get_inventory_alerts))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Transaction routes (protected)
fn transaction_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_transactions))
        .route("/pending", get(handlers::list_pending_confirmations))
        .route("/:transaction_id", get(handlers::get_transaction))
        .route(
            "/:transaction_id/confirmations",
            post(handlers::confirm_transaction),
        )
        // Creation, one route per kind
        .route("/egg-collections", post(handlers::record_egg_collection))
        .route("/food-purchases", post(handlers::record_food_purchase))
        .route("/food-distributions", post(handlers::distribute_food))
        .route("/medicine-purchases", post(handlers::record_medicine_purchase))
        .route("/medicine-distributions", post(handlers::distribute_medicine))
        .route("/egg-distributions", post(handlers::distribute_eggs))
        .route("/egg-sales", post(handlers::record_egg_sale))
        .route("/death-records", post(handlers::record_chicken_death))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
