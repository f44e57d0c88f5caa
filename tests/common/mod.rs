use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, ensure, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use swm_admin::auth::{jwt::JwtService, password};
use swm_admin::bootstrap;
use swm_admin::config::AppConfig;
use swm_admin::models::{self, User};
use swm_admin::routes;
use swm_admin::state::AppState;
use swm_admin::store::{DocumentStore, SledStore};
use tower::util::ServiceExt;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@swm.test";
pub const ADMIN_PASSWORD: &str = "Admin@123";

pub fn test_config() -> AppConfig {
    AppConfig {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        data_dir: PathBuf::from("unused"),
        frontend_origins: Vec::new(),
        jwt_secret: "test-secret".to_string(),
        jwt_issuer: "test-issuer".to_string(),
        jwt_audience: "test-audience".to_string(),
        jwt_expiry_minutes: 60,
        refresh_token_expiry_days: 7,
        admin_email: ADMIN_EMAIL.to_string(),
        admin_default_password: ADMIN_PASSWORD.to_string(),
        admin_auto_repair: true,
        rate_limit_max: 10_000,
        rate_limit_window_secs: 900,
        trust_proxy: false,
        serve_frontend: false,
        static_dir: PathBuf::from("unused"),
        serverless: false,
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn DocumentStore> = Arc::new(SledStore::temporary()?);
        bootstrap::initialize(store.as_ref(), &config).await?;

        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(store, config, jwt);
        let router = routes::create_router(state.clone());

        Ok(Self { state, router })
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.state.store.as_ref()
    }

    pub async fn insert_user(&self, email: &str, password_plain: &str, role: &str) -> Result<String> {
        let now = chrono::Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: models::normalize_email(email),
            name: email.split('@').next().unwrap_or(email).to_string(),
            password_hash: Some(password::hash_password(password_plain)?),
            role: role.to_string(),
            is_active: true,
            permissions: Vec::new(),
            created_at: now,
            updated_at: now,
            last_login: None,
            password_changed_at: None,
        };
        models::save_user(self.store(), &user).await?;
        Ok(user.id)
    }

    #[allow(dead_code)]
    pub async fn set_active(&self, user_id: &str, active: bool) -> Result<()> {
        let mut user = models::load_user(self.store(), user_id)
            .await?
            .ok_or_else(|| anyhow!("user {user_id} missing"))?;
        user.is_active = active;
        models::save_user(self.store(), &user).await
    }

    pub async fn login(&self, email: &str, password_plain: &str) -> Result<Value> {
        let response = self
            .post_json(
                "/api/auth/login",
                &serde_json::json!({ "email": email, "password": password_plain }),
                None,
            )
            .await?;
        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );
        let body: Value = json_body(response).await?;
        Ok(body["data"].clone())
    }

    pub async fn login_token(&self, email: &str, password_plain: &str) -> Result<String> {
        let data = self.login(email, password_plain).await?;
        data["accessToken"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("login response carried no access token"))
    }

    #[allow(dead_code)]
    pub async fn admin_token(&self) -> Result<String> {
        self.login_token(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn send(&self, request: Request<Body>) -> Result<hyper::Response<Body>> {
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body))?).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PUT, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PATCH, path, payload, token).await
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty())?).await
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::DELETE).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty())?).await
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn json_body<T: DeserializeOwned>(response: hyper::Response<Body>) -> Result<T> {
    let bytes = body_to_vec(response.into_body()).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
