//! User and access level models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a user is allowed to do at the till
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Admin,
    Employee,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Admin => "admin",
            AccessLevel::Employee => "employee",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(AccessLevel::Admin),
            "employee" => Some(AccessLevel::Employee),
            _ => None,
        }
    }
}

/// A till operator; the password digest never leaves the backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub access_level: AccessLevel,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.access_level == AccessLevel::Admin
    }
}
