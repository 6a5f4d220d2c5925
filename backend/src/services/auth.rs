//! Authentication service for till operators, login and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::config::Config;
use crate::db::{from_millis, to_millis, Store};
use crate::error::{ensure_valid, AppError, AppResult};
use crate::services::activity::ActivityLog;
use shared::models::{AccessLevel, User};
use shared::validation::{validate_password, validate_username};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Store,
    activity: ActivityLog,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// Input for creating an operator account
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 6))]
    pub password: String,
    pub access_level: AccessLevel,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: i64,
    pub username: String,
    pub access_level: AccessLevel,
    pub exp: i64,
    pub iat: i64,
}

/// Issued session token
#[derive(Debug, Serialize)]
pub struct AuthToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// User info from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    access_level: String,
    is_active: bool,
    created_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        let access_level = AccessLevel::from_str(&row.access_level).ok_or_else(|| {
            AppError::Internal(format!("Unknown access level {}", row.access_level))
        })?;
        Ok(User {
            id: row.id,
            username: row.username,
            access_level,
            is_active: row.is_active,
            created_at: from_millis(row.created_at),
        })
    }
}

const USER_COLUMNS: &str = "id, username, password_hash, access_level, is_active, created_at";

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(store: Store, activity: ActivityLog, config: &Config) -> Self {
        Self {
            store,
            activity,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Check a username and password; inactive accounts never verify
    pub async fn verify_credentials(&self, username: &str, password: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLUMNS
        ))
        .bind(username.trim())
        .fetch_optional(self.store.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        if !row.is_active {
            return Ok(None);
        }

        let valid = verify(password, &row.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Ok(None);
        }

        Ok(Some(row.try_into()?))
    }

    /// Authenticate an operator and issue a session token
    pub async fn login(&self, username: &str, password: &str) -> AppResult<AuthToken> {
        let user = match self.verify_credentials(username, password).await? {
            Some(user) => user,
            None => {
                tracing::warn!(username, "Login rejected");
                return Err(AppError::InvalidCredentials);
            }
        };

        let access_token = self.generate_token(&user)?;

        tracing::info!(user_id = user.id, "User logged in");
        self.activity
            .log(Some(user.id), &format!("User {} logged in", user.username))
            .await;

        Ok(AuthToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
            user,
        })
    }

    /// Validate access token and return claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    fn generate_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expiry);

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            access_level: user.access_level,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Create an operator account with a salted password digest
    pub async fn create_user(&self, input: CreateUserInput, creator_id: i64) -> AppResult<User> {
        input.validate()?;
        let username = input.username.trim().to_string();
        ensure_valid("username", validate_username(&username))?;
        ensure_valid("password", validate_password(&input.password))?;

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let mut tx = self.store.begin_write().await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, password_hash, access_level, is_active, created_at)
            VALUES (?, ?, ?, 1, ?)
            RETURNING id
            "#,
        )
        .bind(&username)
        .bind(&password_hash)
        .bind(input.access_level.as_str())
        .bind(to_millis(Utc::now()))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::unique_or_storage(e, "username"))?;
        tx.commit().await?;

        let user = self.get_user(id).await?;

        tracing::info!(user_id = id, level = user.access_level.as_str(), "User created");
        self.activity
            .log(
                Some(creator_id),
                &format!(
                    "Created {} account {}",
                    user.access_level.as_str(),
                    user.username
                ),
            )
            .await;

        Ok(user)
    }

    pub async fn get_user(&self, id: i64) -> AppResult<User> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(self.store.pool())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", id)))?
            .try_into()
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users ORDER BY username",
            USER_COLUMNS
        ))
        .fetch_all(self.store.pool())
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    /// Enable or disable an account; users are never deleted
    pub async fn set_active(&self, id: i64, active: bool, operator_id: i64) -> AppResult<User> {
        let mut tx = self.store.begin_write().await?;
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {}", id)));
        }
        tx.commit().await?;

        let user = self.get_user(id).await?;
        let action = if active { "Activated" } else { "Deactivated" };
        tracing::info!(user_id = id, active, "User status changed");
        self.activity
            .log(
                Some(operator_id),
                &format!("{} account {}", action, user.username),
            )
            .await;

        Ok(user)
    }
}
