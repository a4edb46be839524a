//! Token-bucket throttling, keyed by client IP for the whole API and by user
//! for recommendation refreshes.

use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::warn;

use pathwise_shared::UserId;

use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn try_consume(&mut self, rate: f64, capacity: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;

        self.tokens = (self.tokens + elapsed * rate).min(capacity);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub struct Throttle<K> {
    buckets: Arc<Mutex<HashMap<K, TokenBucket>>>,
    rate: f64,
    capacity: f64,
}

impl<K> Clone for Throttle<K> {
    fn clone(&self) -> Self {
        Self {
            buckets: Arc::clone(&self.buckets),
            rate: self.rate,
            capacity: self.capacity,
        }
    }
}

impl<K: Hash + Eq> Throttle<K> {
    pub fn new(rate: f64, capacity: f64) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            rate,
            capacity,
        }
    }

    pub async fn check(&self, key: K) -> bool {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets
            .entry(key)
            .or_insert_with(|| TokenBucket::new(self.capacity));
        bucket.try_consume(self.rate, self.capacity)
    }

    pub async fn purge_stale(&self, max_idle_secs: f64) {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        buckets.retain(|_, bucket| {
            now.duration_since(bucket.last_refill).as_secs_f64() < max_idle_secs
        });
    }
}

/// Both limiters the API uses.
#[derive(Clone)]
pub struct Throttles {
    pub per_ip: Throttle<IpAddr>,
    pub refresh: Throttle<UserId>,
}

impl Throttles {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            per_ip: Throttle::new(config.ip_rate, config.ip_burst),
            refresh: Throttle::new(config.user_refresh_rate, config.user_refresh_burst),
        }
    }

    pub async fn check_refresh(&self, user: UserId) -> Result<(), ServerError> {
        if self.refresh.check(user).await {
            Ok(())
        } else {
            warn!(user = %user, "Recommendation refresh throttled");
            Err(ServerError::TooManyRequests)
        }
    }

    pub async fn purge_stale(&self, max_idle_secs: f64) {
        self.per_ip.purge_stale(max_idle_secs).await;
        self.refresh.purge_stale(max_idle_secs).await;
    }
}

pub async fn ip_throttle_middleware(
    State(throttle): State<Throttle<IpAddr>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ServerError> {
    if let Some(ip) = extract_client_ip(&req) {
        if !throttle.check(ip).await {
            warn!(ip = %ip, "Rate limit exceeded");
            return Err(ServerError::TooManyRequests);
        }
    }

    Ok(next.run(req).await)
}

/// Try ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn extract_client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<std::net::SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());

    if let Some(first) = header("x-forwarded-for").and_then(|v| v.split(',').next()) {
        if let Ok(ip) = first.trim().parse::<IpAddr>() {
            return Some(ip);
        }
    }

    header("x-real-ip").and_then(|v| v.trim().parse::<IpAddr>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_burst_then_refuses() {
        let throttle = Throttle::new(10.0, 5.0);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        for _ in 0..5 {
            assert!(throttle.check(ip).await);
        }

        assert!(!throttle.check(ip).await);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let throttle = Throttle::new(0.001, 1.0);
        let (alice, bob) = (UserId::new(), UserId::new());

        assert!(throttle.check(alice).await);
        assert!(!throttle.check(alice).await);
        assert!(throttle.check(bob).await);
    }

    #[tokio::test]
    async fn test_refresh_throttle_reports_429() {
        let config = ServerConfig {
            user_refresh_burst: 1.0,
            ..ServerConfig::default()
        };
        let throttles = Throttles::from_config(&config);
        let user = UserId::new();

        assert!(throttles.check_refresh(user).await.is_ok());
        assert!(matches!(
            throttles.check_refresh(user).await,
            Err(ServerError::TooManyRequests)
        ));
    }

    #[tokio::test]
    async fn test_purge_stale() {
        let throttle = Throttle::new(10.0, 5.0);
        let ip: IpAddr = "192.168.1.1".parse().unwrap();
        assert!(throttle.check(ip).await);

        throttle.purge_stale(0.0).await;

        let buckets = throttle.buckets.lock().await;
        assert!(buckets.is_empty());
    }

    #[test]
    fn test_forwarded_header_fallback() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(())
            .unwrap();
        assert_eq!(extract_client_ip(&req), Some("203.0.113.7".parse().unwrap()));

        let req = Request::builder().header("x-real-ip", "198.51.100.2").body(()).unwrap();
        assert_eq!(extract_client_ip(&req), Some("198.51.100.2".parse().unwrap()));

        let req = Request::builder().body(()).unwrap();
        assert_eq!(extract_client_ip(&req), None);
    }
}
