//! Authentication middleware
//!
//! Bearer-token authentication and admin-only access control

use axum::{
    extract::{Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::AppError;
use crate::services::AuthService;
use crate::AppState;
use shared::models::AccessLevel;

/// Authenticated user information extracted from the session token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub access_level: AccessLevel,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.access_level == AccessLevel::Admin
    }
}

/// Authentication middleware that validates bearer tokens
///
/// Tokens of accounts deactivated after login stop working immediately.
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(|| {
        AppError::Unauthorized("Missing or invalid Authorization header".to_string())
    })?;

    let auth_service = AuthService::new(state.store.clone(), state.activity.clone(), &state.config);
    let claims = auth_service.validate_token(bearer.token())?;

    let user = auth_service
        .get_user(claims.sub)
        .await
        .map_err(|_| AppError::Unauthorized("Unknown account".to_string()))?;
    if !user.is_active {
        return Err(AppError::Unauthorized("Account is disabled".to_string()));
    }

    request.extensions_mut().insert(AuthUser {
        user_id: user.id,
        username: user.username,
        access_level: user.access_level,
    });

    Ok(next.run(request).await)
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// Permission guard for admin-only handlers
pub fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        tracing::warn!(user_id = user.user_id, "Admin action refused");
        Err(AppError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(level: AccessLevel) -> AuthUser {
        AuthUser {
            user_id: 7,
            username: "maria".to_string(),
            access_level: level,
        }
    }

    #[test]
    fn test_require_admin() {
        assert!(require_admin(&user(AccessLevel::Admin)).is_ok());
        assert!(matches!(
            require_admin(&user(AccessLevel::Employee)),
            Err(AppError::Forbidden)
        ));
    }
}
