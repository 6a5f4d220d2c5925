//! Route definitions for the butcher shop API

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
        // Auth routes (public)
        .route("/auth/login", post(handlers::login))
        // Protected routes
        .merge(protected_routes(state))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes())
        .nest("/categories", category_routes())
        .nest("/products", product_routes())
        .nest("/sales", sale_routes())
        .nest("/bulk-units", bulk_unit_routes())
        .nest("/shifts", shift_routes())
        .nest("/reports", report_routes())
        .route("/activity", get(handlers::list_activity))
        .route("/admin/backup", post(handlers::create_backup))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Operator account routes (admin)
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route("/:user_id/activate", post(handlers::activate_user))
        .route("/:user_id/deactivate", post(handlers::deactivate_user))
}

fn category_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::list_categories).post(handlers::create_category),
    )
}

/// Catalogue and stock routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/search", get(handlers::search_product))
        .route("/low-stock", get(handlers::low_stock_products))
        .route("/expiring", get(handlers::expiring_products))
        .route("/:product_id", get(handlers::get_product))
        .route("/:product_id/price", put(handlers::update_price))
        .route("/:product_id/deactivate", post(handlers::deactivate_product))
        .route("/:product_id/stock", post(handlers::adjust_stock))
}

fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route("/:ticket_number", get(handlers::get_sale))
        .route("/:ticket_number/cancel", post(handlers::cancel_sale))
}

/// Half carcass intake and butchering routes
fn bulk_unit_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_bulk_units).post(handlers::register_bulk_unit),
        )
        .route("/available", get(handlers::available_bulk_units))
        .route("/:bulk_unit_id", get(handlers::get_bulk_unit))
        .route("/:bulk_unit_id/butcher", post(handlers::butcher_bulk_unit))
}

fn shift_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::open_shift))
        .route("/current", get(handlers::current_shift))
        .route("/:shift_id", get(handlers::get_shift))
        .route("/:shift_id/close", post(handlers::close_shift))
        .route("/:shift_id/reconciliation", get(handlers::get_reconciliation))
}

/// Sales analytics routes
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/top-products", get(handlers::top_products))
        .route("/operators", get(handlers::operator_revenue))
        .route("/hourly", get(handlers::hourly_revenue))
        .route("/revenue", get(handlers::total_revenue))
}
