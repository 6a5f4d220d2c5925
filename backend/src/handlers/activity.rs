//! Activity log handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::middleware::{require_admin, CurrentUser};
use crate::services::activity::DEFAULT_LIST_LIMIT;
use crate::AppState;
use shared::models::ActivityLogEntry;

#[derive(Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

/// Most recent audit entries, newest first (admin only)
pub async fn list_activity(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<Vec<ActivityLogEntry>>> {
    require_admin(&current_user.0)?;
    let entries = state
        .activity
        .list_recent(query.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?;
    Ok(Json(entries))
}
