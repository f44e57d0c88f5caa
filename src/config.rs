use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@swm.gov.in";
pub const DEFAULT_ADMIN_PASSWORD: &str = "Admin@123";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub frontend_origins: Vec<String>,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
    pub admin_email: String,
    pub admin_default_password: String,
    pub admin_auto_repair: bool,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
    /// Key the rate limiter on `X-Forwarded-For` instead of the peer address.
    pub trust_proxy: bool,
    pub serve_frontend: bool,
    pub static_dir: PathBuf,
    pub serverless: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let server_host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;
        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/swm"));

        let mut frontend_origins = parse_origin_list(env::var("FRONTEND_URLS").ok().as_deref());
        for origin in parse_origin_list(env::var("FRONTEND_URL").ok().as_deref()) {
            if !frontend_origins.contains(&origin) {
                frontend_origins.push(origin);
            }
        }

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "swm-admin".to_string());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "swm-admin-console".to_string());
        let jwt_expiry_minutes = env::var("JWT_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "1440".to_string())
            .parse()
            .context("JWT_EXPIRY_MINUTES must be an integer")?;
        let refresh_token_expiry_days = env::var("REFRESH_TOKEN_EXPIRY_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .context("REFRESH_TOKEN_EXPIRY_DAYS must be an integer")?;

        let admin_email = env::var("ADMIN_EMAIL")
            .map(|value| value.trim().to_lowercase())
            .unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string());
        let admin_default_password = env::var("ADMIN_DEFAULT_PASSWORD")
            .unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());
        let admin_auto_repair = auto_repair_enabled(env::var("ADMIN_AUTO_REPAIR").ok().as_deref());

        let rate_limit_max = env::var("RATE_LIMIT_MAX")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .context("RATE_LIMIT_MAX must be a positive integer")?;
        let rate_limit_window_secs = env::var("RATE_LIMIT_WINDOW_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse()
            .context("RATE_LIMIT_WINDOW_SECS must be a positive integer")?;
        let trust_proxy = env::var("TRUST_PROXY").map(|v| is_truthy(&v)).unwrap_or(false);

        let serve_frontend = env::var("APP_ENV")
            .or_else(|_| env::var("NODE_ENV"))
            .map(|value| value.eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        let static_dir = env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("frontend/dist"));
        let serverless = env::var("VERCEL").map(|v| is_truthy(&v)).unwrap_or(false);

        Ok(Self {
            server_host,
            server_port,
            data_dir,
            frontend_origins,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            jwt_expiry_minutes,
            refresh_token_expiry_days,
            admin_email,
            admin_default_password,
            admin_auto_repair,
            rate_limit_max,
            rate_limit_window_secs,
            trust_proxy,
            serve_frontend,
            static_dir,
            serverless,
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

fn parse_origin_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/'))
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Repair stays on unless the flag is literally `false`.
fn auto_repair_enabled(raw: Option<&str>) -> bool {
    !matches!(raw.map(str::trim), Some(value) if value.eq_ignore_ascii_case("false"))
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
