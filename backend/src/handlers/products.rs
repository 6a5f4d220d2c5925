//! HTTP handlers for the product catalogue and stock endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::stock::CreateProductInput;
use crate::services::StockService;
use crate::AppState;
use shared::models::{Category, Product, StockDirection};
use shared::types::{Money, Weight};

#[derive(Deserialize)]
pub struct ListProductsQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Deserialize)]
pub struct UpdatePriceRequest {
    pub price_per_kg: Money,
}

#[derive(Deserialize)]
pub struct AdjustStockRequest {
    pub weight: Weight,
    pub direction: StockDirection,
}

#[derive(Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
}

fn stock_service(state: &AppState) -> StockService {
    StockService::new(state.store.clone(), state.activity.clone())
}

pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListProductsQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let products = stock_service(&state)
        .list_products(query.include_inactive)
        .await?;
    Ok(Json(products))
}

pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = stock_service(&state)
        .create_product(input, current_user.0.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<Product>> {
    let product = stock_service(&state).get_product(product_id).await?;
    Ok(Json(product))
}

/// Look up a cut by scale code or name; `null` when nothing matches
pub async fn search_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Option<Product>>> {
    let product = stock_service(&state).search_product(&query.q).await?;
    Ok(Json(product))
}

pub async fn low_stock_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Product>>> {
    let products = stock_service(&state).low_stock_products().await?;
    Ok(Json(products))
}

pub async fn expiring_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Product>>> {
    let today = Local::now().date_naive();
    let products = stock_service(&state).expiring_products(today).await?;
    Ok(Json(products))
}

/// Change the price per kg (admin only)
pub async fn update_price(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
    Json(body): Json<UpdatePriceRequest>,
) -> AppResult<Json<Product>> {
    require_admin(&current_user.0)?;
    let product = stock_service(&state)
        .update_price(product_id, body.price_per_kg, current_user.0.user_id)
        .await?;
    Ok(Json(product))
}

pub async fn deactivate_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
) -> AppResult<Json<Product>> {
    require_admin(&current_user.0)?;
    let product = stock_service(&state)
        .deactivate_product(product_id, current_user.0.user_id)
        .await?;
    Ok(Json(product))
}

/// Manual stock correction (admin only)
pub async fn adjust_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i64>,
    Json(body): Json<AdjustStockRequest>,
) -> AppResult<Json<Product>> {
    require_admin(&current_user.0)?;
    let product = stock_service(&state)
        .adjust_stock(product_id, body.weight, body.direction, current_user.0.user_id)
        .await?;
    Ok(Json(product))
}

pub async fn list_categories(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<Category>>> {
    let categories = stock_service(&state).list_categories().await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(body): Json<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    body.validate()?;
    let category = stock_service(&state).create_category(&body.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
