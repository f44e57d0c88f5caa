//! Generic CRUD over one document collection.
//!
//! Every domain group (citizens, workers, facilities, ...) is a [`Resource`]
//! describing its collection, searchable fields, the one field a list may be
//! filtered on, and which roles may read, write and delete.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult},
    extract::JsonBody,
    listing::{paginate, sort_newest_first, ListQuery, RecordFilter},
    models::Role,
    ratings,
    response::ApiResponse,
    schema::validate_document,
    state::AppState,
    utils::json::merge_patch,
};

const RESERVED_FIELDS: &[&str] = &["id", "createdAt", "updatedAt", "createdBy", "updatedBy"];

#[derive(Debug)]
pub struct Resource {
    pub collection: &'static str,
    pub label: &'static str,
    pub search_fields: &'static [&'static str],
    pub filter_fields: &'static [&'static str],
    pub read_roles: &'static [Role],
    pub write_roles: &'static [Role],
    pub delete_roles: &'static [Role],
}

pub fn router(resource: &'static Resource) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(
                move |state: State<AppState>, user: AuthenticatedUser, query: Query<ListQuery>| {
                    list_records(resource, state, user, query)
                },
            )
            .post(
                move |state: State<AppState>, user: AuthenticatedUser, body: JsonBody<Value>| {
                    create_record(resource, state, user, body)
                },
            ),
        )
        .route(
            "/:id",
            get(
                move |state: State<AppState>, user: AuthenticatedUser, id: Path<String>| {
                    get_record(resource, state, user, id)
                },
            )
            .put(
                move |state: State<AppState>,
                      user: AuthenticatedUser,
                      id: Path<String>,
                      body: JsonBody<Value>| {
                    update_record(resource, state, user, id, body)
                },
            )
            .patch(
                move |state: State<AppState>,
                      user: AuthenticatedUser,
                      id: Path<String>,
                      body: JsonBody<Value>| {
                    update_record(resource, state, user, id, body)
                },
            )
            .delete(
                move |state: State<AppState>, user: AuthenticatedUser, id: Path<String>| {
                    delete_record(resource, state, user, id)
                },
            ),
        )
}

fn not_found(resource: &Resource, id: &str) -> AppError {
    AppError::not_found_with(format!("{} {id} not found", resource.label))
}

fn decorated(resource: &Resource, mut document: Value) -> Value {
    ratings::decorate(resource.collection, &mut document);
    document
}

/// Drops fields the server owns from a client payload.
fn sanitize_payload(payload: Value) -> AppResult<Value> {
    let Value::Object(mut fields) = payload else {
        return Err(AppError::bad_request("request body must be a JSON object"));
    };
    for key in RESERVED_FIELDS {
        fields.remove(*key);
    }
    ratings::strip_derived(&mut fields);
    Ok(Value::Object(fields))
}

pub async fn list_records(
    resource: &'static Resource,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Value>>>> {
    user.require_role(resource.read_roles)?;
    let filter = RecordFilter::from_query(&query, resource.search_fields, resource.filter_fields)?;

    let mut matching: Vec<Value> = state
        .store
        .list(resource.collection)
        .await?
        .into_iter()
        .filter(|document| filter.matches(document))
        .collect();
    sort_newest_first(&mut matching);

    let mut page = paginate(matching, query.page, query.page_size);
    page.items = page
        .items
        .into_iter()
        .map(|document| decorated(resource, document))
        .collect();

    Ok(Json(ApiResponse::from(page)))
}

pub async fn get_record(
    resource: &'static Resource,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Value>>> {
    user.require_role(resource.read_roles)?;
    let document = state
        .store
        .get(resource.collection, &id)
        .await?
        .ok_or_else(|| not_found(resource, &id))?;
    Ok(Json(ApiResponse::ok(decorated(resource, document))))
}

pub async fn create_record(
    resource: &'static Resource,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    JsonBody(payload): JsonBody<Value>,
) -> AppResult<(StatusCode, Json<ApiResponse<Value>>)> {
    user.require_role(resource.write_roles)?;
    let mut document = sanitize_payload(payload)?;
    validate_document(resource.collection, &document)?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();
    if let Some(fields) = document.as_object_mut() {
        fields.insert("id".into(), json!(id));
        fields.insert("createdAt".into(), json!(now));
        fields.insert("updatedAt".into(), json!(now));
        fields.insert("createdBy".into(), json!(user.user_id));
    }

    state.store.put(resource.collection, &id, &document).await?;
    tracing::info!(collection = resource.collection, id = %id, user = %user.user_id, "created record");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(decorated(resource, document))),
    ))
}

pub async fn update_record(
    resource: &'static Resource,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<Value>,
) -> AppResult<Json<ApiResponse<Value>>> {
    user.require_role(resource.write_roles)?;
    let patch = sanitize_payload(payload)?;

    let mut document = state
        .store
        .get(resource.collection, &id)
        .await?
        .ok_or_else(|| not_found(resource, &id))?;

    merge_patch(&mut document, &patch);
    validate_document(resource.collection, &document)?;

    if let Some(fields) = document.as_object_mut() {
        fields.insert("updatedAt".into(), json!(Utc::now().to_rfc3339()));
        fields.insert("updatedBy".into(), json!(user.user_id));
    }

    state.store.put(resource.collection, &id, &document).await?;
    tracing::info!(collection = resource.collection, id = %id, user = %user.user_id, "updated record");

    Ok(Json(ApiResponse::ok(decorated(resource, document))))
}

pub async fn delete_record(
    resource: &'static Resource,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    user.require_role(resource.delete_roles)?;
    if !state.store.delete(resource.collection, &id).await? {
        return Err(not_found(resource, &id));
    }
    tracing::info!(collection = resource.collection, id = %id, user = %user.user_id, "deleted record");
    Ok(StatusCode::NO_CONTENT)
}
