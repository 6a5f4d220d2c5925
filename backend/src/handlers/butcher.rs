//! Bulk unit handlers: receiving half carcasses and cutting them into stock

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::butcher::{BulkUnitDetail, ButcherInput, ButcherOutcome, RegisterBulkUnitInput};
use crate::services::ButcherService;
use crate::AppState;
use shared::models::BulkUnit;

fn butcher_service(state: &AppState) -> ButcherService {
    ButcherService::new(state.store.clone(), state.activity.clone())
}

pub async fn list_bulk_units(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<BulkUnit>>> {
    let units = butcher_service(&state).list_bulk_units().await?;
    Ok(Json(units))
}

/// Units with weight still left to cut
pub async fn available_bulk_units(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<Vec<BulkUnit>>> {
    let units = butcher_service(&state).available_bulk_units().await?;
    Ok(Json(units))
}

pub async fn register_bulk_unit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RegisterBulkUnitInput>,
) -> AppResult<(StatusCode, Json<BulkUnit>)> {
    let unit = butcher_service(&state)
        .register_bulk_unit(input, current_user.0.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(unit)))
}

pub async fn get_bulk_unit(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(bulk_unit_id): Path<i64>,
) -> AppResult<Json<BulkUnitDetail>> {
    let detail = butcher_service(&state).get_bulk_unit(bulk_unit_id).await?;
    Ok(Json(detail))
}

/// Cut a bulk unit into product stock
pub async fn butcher_bulk_unit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(bulk_unit_id): Path<i64>,
    Json(input): Json<ButcherInput>,
) -> AppResult<Json<ButcherOutcome>> {
    let outcome = butcher_service(&state)
        .butcher(bulk_unit_id, &input.allocations, current_user.0.user_id)
        .await?;
    Ok(Json(outcome))
}
