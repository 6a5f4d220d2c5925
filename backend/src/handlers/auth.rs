//! Authentication and user management handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::auth::{AuthToken, CreateUserInput};
use crate::services::AuthService;
use crate::AppState;
use shared::models::User;

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 32))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.store.clone(), state.activity.clone(), &state.config)
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthToken>, AppError> {
    body.validate()?;
    let token = auth_service(&state)
        .login(&body.username, &body.password)
        .await?;
    Ok(Json(token))
}

/// List operator accounts (admin only)
pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> Result<Json<Vec<User>>, AppError> {
    require_admin(&current_user.0)?;
    let users = auth_service(&state).list_users().await?;
    Ok(Json(users))
}

/// Create an operator account (admin only)
pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), AppError> {
    require_admin(&current_user.0)?;
    let user = auth_service(&state)
        .create_user(body, current_user.0.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, AppError> {
    require_admin(&current_user.0)?;
    if user_id == current_user.0.user_id {
        return Err(AppError::Conflict(
            "You cannot deactivate your own account".to_string(),
        ));
    }
    let user = auth_service(&state)
        .set_active(user_id, false, current_user.0.user_id)
        .await?;
    Ok(Json(user))
}

pub async fn activate_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, AppError> {
    require_admin(&current_user.0)?;
    let user = auth_service(&state)
        .set_active(user_id, true, current_user.0.user_id)
        .await?;
    Ok(Json(user))
}
