//! Sale handlers: checkout, lookup and cancellation

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;

use crate::error::AppResult;
use crate::handlers::reporting::RangeQuery;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::sale::{CancelSaleInput, CreateSaleInput, SaleDetail, SaleReceipt};
use crate::services::SaleService;
use crate::AppState;
use shared::models::{Sale, SaleReversal};

fn sale_service(state: &AppState) -> SaleService {
    SaleService::new(state.store.clone(), state.activity.clone())
}

/// Record a sale for the logged-in operator
pub async fn create_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<(StatusCode, Json<SaleReceipt>)> {
    let receipt = sale_service(&state)
        .create_sale(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn list_sales(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<Vec<Sale>>> {
    let range = query.resolve(Local::now().date_naive())?;
    let sales = sale_service(&state).list_sales(&range).await?;
    Ok(Json(sales))
}

pub async fn get_sale(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(ticket_number): Path<i64>,
) -> AppResult<Json<SaleDetail>> {
    let sale = sale_service(&state).get_sale(ticket_number).await?;
    Ok(Json(sale))
}

/// Cancel a sale and restore its stock (admin only)
pub async fn cancel_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ticket_number): Path<i64>,
    Json(body): Json<CancelSaleInput>,
) -> AppResult<Json<SaleReversal>> {
    require_admin(&current_user.0)?;
    let reversal = sale_service(&state)
        .cancel_sale(ticket_number, current_user.0.user_id, &body.reason)
        .await?;
    Ok(Json(reversal))
}
