//! Append-only activity log
//!
//! Writing an entry never fails the caller: when the database refuses the
//! row, the entry goes to a local fallback file instead.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tokio::io::AsyncWriteExt;

use crate::db::{from_millis, to_millis, Store};
use crate::error::AppResult;
use shared::models::ActivityLogEntry;

pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Activity log service
#[derive(Clone)]
pub struct ActivityLog {
    store: Store,
    fallback_path: PathBuf,
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    id: i64,
    operator_id: Option<i64>,
    created_at: i64,
    description: String,
}

impl From<ActivityRow> for ActivityLogEntry {
    fn from(row: ActivityRow) -> Self {
        ActivityLogEntry {
            id: row.id,
            operator_id: row.operator_id,
            created_at: from_millis(row.created_at),
            description: row.description,
        }
    }
}

/// One tab-separated fallback record. Control characters in the
/// description are escaped so an entry always stays on one line.
fn fallback_line(at: DateTime<Utc>, operator_id: Option<i64>, description: &str) -> String {
    let operator = operator_id.map(|id| id.to_string()).unwrap_or_default();
    let mut escaped = String::with_capacity(description.len());
    for c in description.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c if c.is_control() => escaped.extend(c.escape_unicode()),
            c => escaped.push(c),
        }
    }
    format!("{}\t{}\t{}\n", at.to_rfc3339(), operator, escaped)
}

impl ActivityLog {
    pub fn new(store: Store, fallback_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            fallback_path: fallback_path.into(),
        }
    }

    /// Record an activity; storage failures are logged, never returned
    pub async fn log(&self, operator_id: Option<i64>, description: &str) {
        let now = Utc::now();
        if let Err(e) = self.insert(operator_id, now, description).await {
            tracing::error!(error = %e, operator_id, "Failed to store activity entry");

            let line = fallback_line(now, operator_id, description);
            if let Err(e) = self.append_fallback(&line).await {
                tracing::error!(
                    error = %e,
                    path = %self.fallback_path.display(),
                    "Failed to write activity fallback file"
                );
            }
        }
    }

    async fn insert(
        &self,
        operator_id: Option<i64>,
        at: DateTime<Utc>,
        description: &str,
    ) -> AppResult<()> {
        // Every write, audit rows included, holds the writer lock
        let mut tx = self.store.begin_write().await?;
        sqlx::query(
            "INSERT INTO activity_log (operator_id, created_at, description) VALUES (?, ?, ?)",
        )
        .bind(operator_id)
        .bind(to_millis(at))
        .bind(description)
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }

    async fn append_fallback(&self, line: &str) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.fallback_path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    /// Most recent entries first
    pub async fn list_recent(&self, limit: i64) -> AppResult<Vec<ActivityLogEntry>> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT id, operator_id, created_at, description
            FROM activity_log
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit.clamp(1, 1000))
        .fetch_all(self.store.pool())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_line_escapes_control_characters() {
        let at = Utc::now();
        let line = fallback_line(at, Some(3), "Cancelled ticket #4: wrong cut\n2024\tforged\\x");
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with('\n'));
        let fields: Vec<&str> = line.trim_end_matches('\n').split('\t').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1], "3");
        assert_eq!(fields[2], "Cancelled ticket #4: wrong cut\\n2024\\tforged\\\\x");
    }

    #[test]
    fn test_fallback_line_without_operator() {
        let line = fallback_line(Utc::now(), None, "Backup written");
        let fields: Vec<&str> = line.trim_end_matches('\n').split('\t').collect();
        assert_eq!(fields[1], "");
        assert_eq!(fields[2], "Backup written");
    }
}
