//! Maintenance handlers

use std::path::Path;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::AppState;

#[derive(Serialize)]
pub struct BackupResponse {
    pub path: String,
}

/// Write a timestamped copy of the database into the backup directory
pub async fn create_backup(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<(StatusCode, Json<BackupResponse>)> {
    require_admin(&current_user.0)?;
    let path = state
        .store
        .backup_to(Path::new(&state.config.database.backup_dir))
        .await?;
    state
        .activity
        .log(
            Some(current_user.0.user_id),
            &format!("Database backup written to {}", path.display()),
        )
        .await;
    Ok((
        StatusCode::CREATED,
        Json(BackupResponse {
            path: path.display().to_string(),
        }),
    ))
}
