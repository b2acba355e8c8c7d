//! Per-client rate limiting for the API
//!
//! Each client IP gets a token bucket refilled at `requests_per_second` up to
//! `burst_size`. Health and OpenAPI paths and trusted IPs are exempt by
//! default. Rejected requests get 429 with a `Retry-After` header.

use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Instant,
};
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;
use crate::error::ApiError;

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn full(capacity: u32, now: Instant) -> Self {
        Self {
            tokens: f64::from(capacity),
            last_refill: now,
        }
    }

    /// Take one token, or return the whole seconds until one is available
    fn try_consume(&mut self, rate: f64, capacity: u32, now: Instant) -> Option<u64> {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(f64::from(capacity));
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            Some(((1.0 - self.tokens) / rate).ceil().max(1.0) as u64)
        }
    }
}

/// Rate limiter with one bucket per client IP
pub struct RateLimiter {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter from configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn is_exempt(&self, path: &str, ip: IpAddr) -> bool {
        self.config.exempt_ips.contains(&ip)
            || self
                .config
                .exempt_paths
                .iter()
                .any(|exempt| path.starts_with(exempt.as_str()))
    }

    /// Admit a request, or return the seconds the client should wait
    pub async fn check(&self, path: &str, addr: SocketAddr) -> Option<u64> {
        self.check_at(path, addr.ip(), Instant::now()).await
    }

    async fn check_at(&self, path: &str, ip: IpAddr, now: Instant) -> Option<u64> {
        if self.is_exempt(path, ip) {
            return None;
        }

        let rate = f64::from(self.config.requests_per_second.max(1));
        let capacity = self.config.burst_size.max(1);

        let mut buckets = self.buckets.lock().await;
        buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::full(capacity, now))
            .try_consume(rate, capacity, now)
    }
}

/// Rate limiting middleware function
///
/// Requires the router to be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let Some(retry_after) = limiter.check(request.uri().path(), addr).await else {
        return next.run(request).await;
    };

    tracing::debug!(client = %addr.ip(), retry_after, "Rate limit exceeded");

    let body = ApiError::with_details(
        "rate_limited",
        "Too many requests",
        serde_json::json!({ "retry_after_seconds": retry_after }),
    );
    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}
