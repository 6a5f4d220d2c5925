//! Shift handlers: opening the drawer, closing it and reading the reconciliation

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::{AppError, AppResult};
use crate::middleware::{AuthUser, CurrentUser};
use crate::services::shift::{CloseShiftInput, OpenShiftInput};
use crate::services::ShiftService;
use crate::AppState;
use shared::models::{Reconciliation, ReconciliationReport, Shift};

fn shift_service(state: &AppState) -> ShiftService {
    ShiftService::new(state.store.clone(), state.activity.clone())
}

/// Operators see their own shifts; admins see all of them
fn ensure_can_access(user: &AuthUser, shift: &Shift) -> Result<(), AppError> {
    if shift.operator_id == user.user_id || user.is_admin() {
        Ok(())
    } else {
        tracing::warn!(user_id = user.user_id, shift_id = shift.id, "Shift access refused");
        Err(AppError::Forbidden)
    }
}

pub async fn open_shift(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<OpenShiftInput>,
) -> AppResult<(StatusCode, Json<Shift>)> {
    let shift = shift_service(&state)
        .open_shift(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(shift)))
}

/// The caller's open shift, or `null`
pub async fn current_shift(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Option<Shift>>> {
    let shift = shift_service(&state)
        .get_open_shift(current_user.0.user_id)
        .await?;
    Ok(Json(shift))
}

pub async fn get_shift(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(shift_id): Path<i64>,
) -> AppResult<Json<Shift>> {
    let shift = shift_service(&state).get_shift(shift_id).await?;
    ensure_can_access(&current_user.0, &shift)?;
    Ok(Json(shift))
}

pub async fn close_shift(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(shift_id): Path<i64>,
    Json(input): Json<CloseShiftInput>,
) -> AppResult<Json<ReconciliationReport>> {
    let service = shift_service(&state);
    let shift = service.get_shift(shift_id).await?;
    ensure_can_access(&current_user.0, &shift)?;
    let report = service.close_shift(shift_id, input.counted_cash).await?;
    Ok(Json(report))
}

pub async fn get_reconciliation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(shift_id): Path<i64>,
) -> AppResult<Json<Reconciliation>> {
    let service = shift_service(&state);
    let shift = service.get_shift(shift_id).await?;
    ensure_can_access(&current_user.0, &shift)?;
    let reconciliation = service.get_reconciliation(shift_id).await?;
    Ok(Json(reconciliation))
}
