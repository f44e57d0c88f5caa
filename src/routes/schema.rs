use axum::Json;

use crate::{
    auth::AuthenticatedUser,
    error::AppResult,
    models::roles,
    response::ApiResponse,
    schema::{CollectionSchema, COLLECTIONS},
};

pub async fn list_collection_schemas(
    user: AuthenticatedUser,
) -> AppResult<Json<ApiResponse<&'static [CollectionSchema]>>> {
    user.require_role(roles::ADMIN_ONLY)?;
    Ok(Json(ApiResponse::ok(COLLECTIONS)))
}
