//! Fixed-window request limiter keyed by client address.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::AppError, state::AppState};

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

const PRUNE_THRESHOLD: usize = 10_000;

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32, reset_after: Duration },
    Limited { retry_after: Duration },
}

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if windows.len() >= PRUNE_THRESHOLD && !windows.contains_key(key) {
            let span = self.window;
            windows.retain(|_, window| now.duration_since(window.started) < span);
        }

        let window = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        let reset_after = self
            .window
            .saturating_sub(now.duration_since(window.started));
        if window.count >= self.max_requests {
            return Decision::Limited {
                retry_after: reset_after,
            };
        }

        window.count += 1;
        Decision::Allowed {
            remaining: self.max_requests - window.count,
            reset_after,
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }
}

/// Peer address of the connection. The first `X-Forwarded-For` hop is used
/// instead only when `trust_proxy` is set.
pub fn client_key(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(address) = forwarded {
            return address.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

pub async fn enforce(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = client_key(&request, state.config.trust_proxy);
    match state.rate_limiter.check(&key) {
        Decision::Allowed {
            remaining,
            reset_after,
        } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(
                RATELIMIT_LIMIT,
                HeaderValue::from(state.rate_limiter.max_requests()),
            );
            headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
            headers.insert(
                RATELIMIT_RESET,
                HeaderValue::from(ceil_secs(reset_after)),
            );
            response
        }
        Decision::Limited { retry_after } => {
            tracing::warn!(client = %key, "rate limit exceeded");
            let mut headers = HeaderMap::new();
            headers.insert(RETRY_AFTER, HeaderValue::from(ceil_secs(retry_after)));
            (headers, AppError::rate_limited(RATE_LIMIT_MESSAGE)).into_response()
        }
    }
}
