use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{jwt::TokenKind, password, AuthenticatedUser},
    error::{AppError, AppResult},
    extract::JsonBody,
    models::{self, roles, Role, User, UserProfile},
    response::ApiResponse,
    schema::{collections::USERS, validate_document},
    state::AppState,
};

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub permissions: Option<Vec<String>>,
}

fn issue_tokens(state: &AppState, user: &User) -> AppResult<LoginResponse> {
    Ok(LoginResponse {
        access_token: state.jwt.generate_access_token(user)?,
        refresh_token: state.jwt.generate_refresh_token(user)?,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.access_expiry_seconds(),
        user: user.profile(),
    })
}

fn check_password_strength(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let invalid = || AppError::unauthorized_with("Invalid email or password");

    let mut user = models::find_user_by_email(state.store.as_ref(), &payload.email)
        .await?
        .ok_or_else(invalid)?;

    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;
    let valid = password::verify_password(&payload.password, hash).map_err(|_| invalid())?;
    if !valid {
        return Err(invalid());
    }

    if !user.is_active {
        return Err(AppError::unauthorized_with("Account is deactivated"));
    }

    user.last_login = Some(Utc::now());
    models::save_user(state.store.as_ref(), &user).await?;
    tracing::info!(user = %user.id, role = %user.role, "user logged in");

    Ok(Json(ApiResponse::ok(issue_tokens(&state, &user)?)))
}

pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let claims = state
        .jwt
        .verify_kind(&payload.refresh_token, TokenKind::Refresh)
        .map_err(|_| AppError::unauthorized())?;

    let user = models::load_user(state.store.as_ref(), &claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::unauthorized_with("Not authorized, user not found or inactive"))?;

    Ok(Json(ApiResponse::ok(issue_tokens(&state, &user)?)))
}

/// Tokens are stateless; the client discards them.
pub async fn logout(user: AuthenticatedUser) -> StatusCode {
    tracing::info!(user = %user.user_id, "user logged out");
    StatusCode::NO_CONTENT
}

pub async fn me(user: AuthenticatedUser) -> Json<ApiResponse<AuthenticatedUser>> {
    Json(ApiResponse::ok(user))
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    check_password_strength(&payload.new_password)?;

    let mut stored = models::load_user(state.store.as_ref(), &user.user_id)
        .await?
        .ok_or_else(AppError::unauthorized)?;

    let current_ok = stored
        .password_hash
        .as_deref()
        .map(|hash| password::verify_password(&payload.current_password, hash))
        .transpose()?
        .unwrap_or(false);
    if !current_ok {
        return Err(AppError::bad_request("current password is incorrect"));
    }

    let now = Utc::now();
    stored.password_hash = Some(password::hash_password(&payload.new_password)?);
    stored.password_changed_at = Some(now);
    stored.updated_at = now;
    models::save_user(state.store.as_ref(), &stored).await?;
    tracing::info!(user = %stored.id, "password changed");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn register(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserProfile>>)> {
    user.require_role(roles::ADMIN_ONLY)?;

    let email = models::normalize_email(&payload.email);
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::bad_request("a valid email is required"));
    }
    check_password_strength(&payload.password)?;

    if models::find_user_by_email(state.store.as_ref(), &email)
        .await?
        .is_some()
    {
        return Err(AppError::bad_request("email is already registered"));
    }

    let now = Utc::now();
    let new_user = User {
        id: Uuid::new_v4().to_string(),
        email,
        name: payload.name.trim().to_string(),
        password_hash: Some(password::hash_password(&payload.password)?),
        role: payload.role.as_str().to_string(),
        is_active: true,
        permissions: payload.permissions,
        created_at: now,
        updated_at: now,
        last_login: None,
        password_changed_at: None,
    };
    validate_document(USERS, &serde_json::to_value(&new_user)?)?;
    models::save_user(state.store.as_ref(), &new_user).await?;
    tracing::info!(user = %new_user.id, role = %new_user.role, created_by = %user.user_id, "registered user");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(new_user.profile()))))
}

pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ApiResponse<Vec<UserProfile>>>> {
    user.require_role(roles::ADMIN_ONLY)?;

    let mut profiles = Vec::new();
    for raw in state.store.list(USERS).await? {
        let stored: User = serde_json::from_value(raw)?;
        profiles.push(stored.profile());
    }
    profiles.sort_by(|a, b| a.email.cmp(&b.email));
    Ok(Json(ApiResponse::ok(profiles)))
}

pub async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    user.require_role(roles::ADMIN_ONLY)?;
    if user_id == user.user_id && (payload.is_active == Some(false) || payload.role.is_some()) {
        return Err(AppError::bad_request(
            "administrators cannot deactivate or re-role their own account",
        ));
    }

    let mut stored = models::load_user(state.store.as_ref(), &user_id)
        .await?
        .ok_or_else(|| AppError::not_found_with(format!("user {user_id} not found")))?;

    if let Some(name) = payload.name {
        stored.name = name.trim().to_string();
    }
    if let Some(role) = payload.role {
        stored.role = role.as_str().to_string();
    }
    if let Some(is_active) = payload.is_active {
        stored.is_active = is_active;
    }
    if let Some(permissions) = payload.permissions {
        stored.permissions = permissions;
    }
    stored.updated_at = Utc::now();
    models::save_user(state.store.as_ref(), &stored).await?;
    tracing::info!(user = %stored.id, active = stored.is_active, updated_by = %user.user_id, "updated user");

    Ok(Json(ApiResponse::ok(stored.profile())))
}
