use std::sync::Arc;
use std::time::Instant;

use crate::{
    auth::jwt::JwtService, config::AppConfig, rate_limit::RateLimiter, store::DocumentStore,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<AppConfig>,
    pub jwt: JwtService,
    pub rate_limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: AppConfig, jwt: JwtService) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_max,
            config.rate_limit_window(),
        ));
        Self {
            store,
            config: Arc::new(config),
            jwt,
            rate_limiter,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
