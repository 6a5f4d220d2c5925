//! Audit trail entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityLogEntry {
    pub id: i64,
    /// `None` for system events
    pub operator_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub description: String,
}
