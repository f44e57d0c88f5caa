pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{self, Role},
    state::AppState,
};
use jwt::TokenKind;

/// Token claims merged with the stored user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub issued_at: usize,
    pub expires_at: usize,
}

impl AuthenticatedUser {
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    pub fn require_role(&self, allowed: &[Role]) -> AppResult<()> {
        match self.role() {
            Some(role) if allowed.contains(&role) => Ok(()),
            _ => Err(AppError::forbidden(&self.role)),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized_with("Not authorized, no token"))?;

        let claims = state
            .jwt
            .verify_kind(bearer.token(), TokenKind::Access)
            .map_err(|err| {
                tracing::debug!(error = %err, "bearer token rejected");
                AppError::unauthorized()
            })?;

        let user = models::load_user(state.store.as_ref(), &claims.sub)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| AppError::unauthorized_with("Not authorized, user not found or inactive"))?;

        let authenticated = AuthenticatedUser {
            user_id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            permissions: user.permissions,
            issued_at: claims.iat,
            expires_at: claims.exp,
        };
        parts.extensions.insert(authenticated.clone());
        Ok(authenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn user_with_role(role: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: "u1".into(),
            email: "u1@swm.gov.in".into(),
            name: "U One".into(),
            role: role.into(),
            permissions: Vec::new(),
            issued_at: 0,
            expires_at: 0,
        }
    }

    #[test]
    fn allowed_role_passes() {
        let user = user_with_role("supervisor");
        assert!(user.require_role(models::roles::STAFF).is_ok());
    }

    #[test]
    fn role_outside_allow_list_is_forbidden() {
        let user = user_with_role("citizen");
        let err = user.require_role(models::roles::STAFF).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[test]
    fn unknown_role_is_never_allowed() {
        let user = user_with_role("superuser");
        let err = user.require_role(models::roles::EVERYONE).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }
}
