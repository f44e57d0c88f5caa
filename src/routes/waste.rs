use axum::{extract::State, Json};
use serde_json::Value;

use crate::{
    auth::AuthenticatedUser,
    bootstrap::GUIDELINES_ID,
    error::{AppError, AppResult},
    response::ApiResponse,
    schema::collections::WASTE_GUIDELINES,
    state::AppState,
};

/// Segregation guidelines; readable by any signed-in user.
pub async fn get_guidelines(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<Json<ApiResponse<Value>>> {
    let guidelines = state
        .store
        .get(WASTE_GUIDELINES, GUIDELINES_ID)
        .await?
        .ok_or_else(|| AppError::not_found_with("waste guidelines have not been seeded"))?;
    Ok(Json(ApiResponse::ok(guidelines)))
}
