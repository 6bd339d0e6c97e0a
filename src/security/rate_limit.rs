//! Per-client rate limiting middleware.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::ConnectInfo;
use axum::http::{header::RETRY_AFTER, HeaderValue};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::http::middleware::{Middleware, MiddlewareKind, MiddlewareOutcome, ResponseDraft};
use crate::http::request::IncomingRequest;
use crate::http::response::ApiError;
use crate::security::auth::Principal;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Default number of tracked clients before idle buckets are swept.
pub const DEFAULT_MAX_CLIENTS: usize = 10_000;

/// Token bucket per client.
///
/// Clients are keyed by authenticated principal when the auth step ran first,
/// otherwise by peer IP. Forwarding headers are not trusted for keying.
///
/// Once more than `max_clients` keys are tracked, a new key triggers a sweep
/// of buckets idle for at least `burst / rps` seconds. Such a bucket has
/// refilled to capacity, so dropping it does not change any decision.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    rps: f64,
    burst: f64,
    max_clients: usize,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        Self {
            buckets: DashMap::new(),
            rps: requests_per_second as f64,
            burst: burst_size as f64,
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }

    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    /// `None` when rate limiting is disabled.
    pub fn from_config(config: &RateLimitConfig) -> Option<Self> {
        config.enabled.then(|| {
            Self::new(config.requests_per_second, config.burst_size)
                .with_max_clients(config.max_clients)
        })
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    fn idle_ttl(&self) -> Duration {
        Duration::try_from_secs_f64(self.burst / self.rps).unwrap_or(Duration::MAX)
    }

    fn evict_idle(&self) {
        let ttl = self.idle_ttl();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| bucket.last_update.elapsed() < ttl);
        tracing::debug!(
            evicted = before.saturating_sub(self.buckets.len()),
            remaining = self.buckets.len(),
            "Swept idle rate limit buckets"
        );
    }

    fn client_key(req: &IncomingRequest) -> String {
        if let Some(principal) = req.extensions.get::<Principal>() {
            return format!("key:{}", principal.key_id);
        }
        if let Some(ConnectInfo(addr)) = req.extensions.get::<ConnectInfo<SocketAddr>>() {
            return format!("ip:{}", addr.ip());
        }
        "anonymous".to_string()
    }

    fn check(&self, key: String) -> bool {
        // Sweep before taking the entry lock; `retain` locks every shard.
        if self.buckets.len() >= self.max_clients && !self.buckets.contains_key(&key) {
            self.evict_idle();
        }

        let mut bucket = self
            .buckets
            .entry(key)
            .or_insert_with(|| TokenBucket::new(self.burst));
        bucket.try_acquire(self.burst, self.rps)
    }
}

impl Middleware for RateLimiter {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn kind(&self) -> MiddlewareKind {
        MiddlewareKind::RateLimit
    }

    fn handle(&self, req: &mut IncomingRequest, res: &mut ResponseDraft) -> MiddlewareOutcome {
        let key = Self::client_key(req);
        if self.check(key.clone()) {
            return MiddlewareOutcome::Continue;
        }

        tracing::warn!(client = %key, "Rate limit exceeded");
        res.headers.insert(RETRY_AFTER, HeaderValue::from_static("1"));
        MiddlewareOutcome::Respond(ApiError::TooManyRequests.to_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};

    fn request_from(ip: [u8; 4]) -> IncomingRequest {
        let mut req = IncomingRequest::new(Method::GET, "/leads");
        req.extensions
            .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
        req
    }

    #[test]
    fn test_burst_then_reject() {
        let limiter = RateLimiter::new(1, 2);
        let mut draft = ResponseDraft::default();

        assert_eq!(limiter.handle(&mut request_from([10, 0, 0, 1]), &mut draft), MiddlewareOutcome::Continue);
        assert_eq!(limiter.handle(&mut request_from([10, 0, 0, 1]), &mut draft), MiddlewareOutcome::Continue);

        match limiter.handle(&mut request_from([10, 0, 0, 1]), &mut draft) {
            MiddlewareOutcome::Respond(result) => {
                assert_eq!(result.status, StatusCode::TOO_MANY_REQUESTS);
            }
            other => panic!("expected 429, got {other:?}"),
        }
        assert_eq!(draft.headers.get(RETRY_AFTER).unwrap(), "1");
    }

    #[test]
    fn test_clients_have_separate_buckets() {
        let limiter = RateLimiter::new(1, 1);
        let mut draft = ResponseDraft::default();

        assert_eq!(limiter.handle(&mut request_from([10, 0, 0, 1]), &mut draft), MiddlewareOutcome::Continue);
        assert_eq!(limiter.handle(&mut request_from([10, 0, 0, 2]), &mut draft), MiddlewareOutcome::Continue);
        assert_ne!(limiter.handle(&mut request_from([10, 0, 0, 1]), &mut draft), MiddlewareOutcome::Continue);
    }

    #[test]
    fn test_idle_buckets_swept_past_cap() {
        // Idle TTL is burst / rps = 1ms.
        let limiter = RateLimiter::new(1000, 1).with_max_clients(3);
        for i in 0..3 {
            limiter
                .buckets
                .insert(format!("ip:10.0.1.{i}"), TokenBucket::new(1.0));
        }
        std::thread::sleep(Duration::from_millis(20));

        let mut draft = ResponseDraft::default();
        assert_eq!(limiter.handle(&mut request_from([10, 0, 0, 1]), &mut draft), MiddlewareOutcome::Continue);

        assert_eq!(limiter.tracked_clients(), 1);
        assert!(limiter.buckets.contains_key("ip:10.0.0.1"));
    }

    #[test]
    fn test_active_buckets_survive_sweep() {
        let limiter = RateLimiter::new(1, 1).with_max_clients(1);
        let mut draft = ResponseDraft::default();

        assert_eq!(limiter.handle(&mut request_from([10, 0, 0, 1]), &mut draft), MiddlewareOutcome::Continue);
        assert_eq!(limiter.handle(&mut request_from([10, 0, 0, 2]), &mut draft), MiddlewareOutcome::Continue);

        // 10.0.0.1 was seen well within `burst / rps`, so it keeps its empty bucket.
        assert_eq!(limiter.tracked_clients(), 2);
        assert_ne!(limiter.handle(&mut request_from([10, 0, 0, 1]), &mut draft), MiddlewareOutcome::Continue);
    }

    #[test]
    fn test_from_config_carries_cap() {
        let config = RateLimitConfig {
            enabled: true,
            max_clients: 7,
            ..RateLimitConfig::default()
        };
        assert_eq!(RateLimiter::from_config(&config).unwrap().max_clients, 7);
        assert!(RateLimiter::from_config(&RateLimitConfig::default()).is_none());
    }

    #[test]
    fn test_principal_preferred_over_ip() {
        let mut req = request_from([10, 0, 0, 1]);
        req.extensions.insert(Principal {
            key_id: "crm-admin".into(),
        });
        assert_eq!(RateLimiter::client_key(&req), "key:crm-admin");
        assert_eq!(RateLimiter::client_key(&request_from([10, 0, 0, 9])), "ip:10.0.0.9");
        assert_eq!(
            RateLimiter::client_key(&IncomingRequest::new(Method::GET, "/")),
            "anonymous"
        );
    }
}
