use std::any::Any;

use axum::http::{HeaderValue, Method};
use axum::{
    extract::{DefaultBodyLimit, OriginalUri},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::{
    auth::AuthenticatedUser,
    error::{self, AppError},
    models::roles::*,
    rate_limit,
    schema::collections::*,
    state::AppState,
};
use records::Resource;

pub mod analytics;
pub mod auth;
pub mod health;
pub mod records;
pub mod schema;
pub mod waste;

const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

pub static CITIZEN_RESOURCE: Resource = Resource {
    collection: CITIZENS,
    label: "Citizen",
    search_fields: &["personalInfo.name", "aadhaar", "address.ward"],
    filter_fields: &["trainingStatus", "address.ward", "ulbCode"],
    read_roles: STAFF_AND_CHAMPIONS,
    write_roles: STAFF,
    delete_roles: MANAGERS,
};

pub static WORKER_RESOURCE: Resource = Resource {
    collection: WASTE_WORKERS,
    label: "Waste worker",
    search_fields: &["personalInfo.name", "employeeId", "areaAssigned"],
    filter_fields: &["shift", "trainingStatus", "areaAssigned"],
    read_roles: STAFF,
    write_roles: MANAGERS,
    delete_roles: MANAGERS,
};

pub static CHAMPION_RESOURCE: Resource = Resource {
    collection: GREEN_CHAMPIONS,
    label: "Green champion",
    search_fields: &["personalInfo.name", "areaAssigned"],
    filter_fields: &["areaAssigned", "ulbCode"],
    read_roles: STAFF,
    write_roles: MANAGERS,
    delete_roles: MANAGERS,
};

pub static WASTE_RECORD_RESOURCE: Resource = Resource {
    collection: WASTE_RECORDS,
    label: "Waste record",
    search_fields: &["source", "category", "collectedBy"],
    filter_fields: &["category", "facilityId"],
    read_roles: FIELD,
    write_roles: STAFF_AND_WORKERS,
    delete_roles: MANAGERS,
};

pub static VEHICLE_RESOURCE: Resource = Resource {
    collection: COLLECTION_VEHICLES,
    label: "Collection vehicle",
    search_fields: &["vehicleNumber", "driver.name", "route"],
    filter_fields: &["status", "type"],
    read_roles: STAFF_AND_WORKERS,
    write_roles: MANAGERS,
    delete_roles: MANAGERS,
};

pub static FACILITY_RESOURCE: Resource = Resource {
    collection: WASTE_FACILITIES,
    label: "Facility",
    search_fields: &["name", "location.address", "operator"],
    filter_fields: &["type", "status"],
    read_roles: STAFF,
    write_roles: MANAGERS,
    delete_roles: ADMIN_ONLY,
};

pub static MONITORING_RESOURCE: Resource = Resource {
    collection: MONITORING_REPORTS,
    label: "Monitoring report",
    search_fields: &["area", "inspector", "findings"],
    filter_fields: &["status", "area"],
    read_roles: STAFF_AND_CHAMPIONS,
    write_roles: STAFF_AND_CHAMPIONS,
    delete_roles: MANAGERS,
};

pub static INCENTIVE_RESOURCE: Resource = Resource {
    collection: INCENTIVES,
    label: "Incentive",
    search_fields: &["recipientId", "reason"],
    filter_fields: &["kind", "status", "recipientType"],
    read_roles: STAFF,
    write_roles: STAFF,
    delete_roles: MANAGERS,
};

pub static COMMUNITY_RESOURCE: Resource = Resource {
    collection: COMMUNITY_REPORTS,
    label: "Community report",
    search_fields: &["description", "location.address", "category"],
    filter_fields: &["category", "status"],
    read_roles: EVERYONE,
    write_roles: EVERYONE,
    delete_roles: MANAGERS,
};

pub static ULB_RESOURCE: Resource = Resource {
    collection: ULBS,
    label: "ULB",
    search_fields: &["name", "code", "district"],
    filter_fields: &["state", "district"],
    read_roles: STAFF,
    write_roles: MANAGERS,
    delete_roles: ADMIN_ONLY,
};

pub static POLICY_RESOURCE: Resource = Resource {
    collection: POLICIES,
    label: "Policy",
    search_fields: &["title", "description", "ulbCode"],
    filter_fields: &["category", "status", "ulbCode"],
    read_roles: EVERYONE,
    write_roles: MANAGERS,
    delete_roles: ADMIN_ONLY,
};

pub static SHOP_RESOURCE: Resource = Resource {
    collection: SHOP_ITEMS,
    label: "Shop item",
    search_fields: &["name", "description", "category"],
    filter_fields: &["category"],
    read_roles: EVERYONE,
    write_roles: MANAGERS,
    delete_roles: MANAGERS,
};

fn cors_layer(state: &AppState) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(tower_http::cors::AllowMethods::mirror_request())
        .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
        .allow_credentials(true);

    if state.config.frontend_origins.is_empty() {
        return base.allow_origin(AllowOrigin::mirror_request());
    }

    let origins: Vec<HeaderValue> = state
        .config
        .frontend_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

pub async fn not_found(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::not_found_with(format!("Route {method} {} not found", uri.path()))
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    AppError::internal(format!("handler panicked: {detail}")).into_response()
}

pub fn create_router(state: AppState) -> Router<()> {
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/password", put(auth::change_password))
        .route("/register", post(auth::register))
        .route("/users", get(auth::list_users))
        .route("/users/:id", patch(auth::update_user));

    let waste_routes = records::router(&WASTE_RECORD_RESOURCE)
        .route("/guidelines", get(waste::get_guidelines));

    let protected_routes = Router::new()
        .nest("/citizens", records::router(&CITIZEN_RESOURCE))
        .nest("/workers", records::router(&WORKER_RESOURCE))
        .nest("/champions", records::router(&CHAMPION_RESOURCE))
        .nest("/waste", waste_routes)
        .nest("/collection", records::router(&VEHICLE_RESOURCE))
        .nest("/facilities", records::router(&FACILITY_RESOURCE))
        .nest("/monitoring", records::router(&MONITORING_RESOURCE))
        .nest("/incentives", records::router(&INCENTIVE_RESOURCE))
        .nest("/community", records::router(&COMMUNITY_RESOURCE))
        .nest("/ulb", records::router(&ULB_RESOURCE))
        .nest("/policies", records::router(&POLICY_RESOURCE))
        .nest("/shop", records::router(&SHOP_RESOURCE))
        .route("/analytics/summary", get(analytics::summary))
        .route("/schema", get(schema::list_collection_schemas))
        .route_layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(
            state.clone(),
        ));

    let api_routes = Router::new()
        .route("/health", get(health::health_check))
        .nest("/auth", auth_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ));

    let router = Router::new().nest("/api", api_routes);
    let router = if state.config.serve_frontend {
        let static_dir = state.config.static_dir.clone();
        let index = static_dir.join("index.html");
        router.fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index)))
    } else {
        router.fallback(not_found)
    };

    let cors = cors_layer(&state);
    router
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(error::envelope_errors))
        .layer(cors)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
}
