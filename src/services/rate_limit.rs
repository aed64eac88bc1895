//! Fixed-window request limiter for the narrative endpoint.

use crate::config::RateLimitConfig;
use crate::utils::http::extract_client_ip;
use actix_web::{HttpRequest, HttpResponse};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};
use tracing::warn;

/// In-memory limiter keyed by client address.
///
/// Each key may make `max_requests` calls per `period_seconds` window; the
/// window restarts with the first call after it expires.
#[derive(Clone)]
pub struct SimpleRateLimiter {
    config: RateLimitConfig,
    storage: Arc<Mutex<HashMap<String, (usize, Instant)>>>,
}

impl SimpleRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            storage: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn period(&self) -> Duration {
        Duration::from_secs(self.config.period_seconds)
    }

    /// Count a call for `key`; `false` once the key has used up its window
    pub fn check_rate_limit(&self, key: &str) -> bool {
        // counters stay consistent even if a holder panicked
        let mut storage = self.storage.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let period = self.period();

        storage.retain(|_, (_, started)| now.duration_since(*started) < period);

        match storage.get_mut(key) {
            Some((count, _)) if *count >= self.config.max_requests => false,
            Some((count, _)) => {
                *count += 1;
                true
            }
            None => {
                storage.insert(key.to_string(), (1, now));
                true
            }
        }
    }
}

/// Reject the request with 429 when its client is over budget
pub fn enforce_rate_limit(
    req: &HttpRequest,
    limiter: &SimpleRateLimiter,
) -> Result<(), HttpResponse> {
    let ip = extract_client_ip(req);

    if !limiter.check_rate_limit(&ip) {
        warn!(ip = %ip, path = %req.path(), "Rate limit exceeded");
        return Err(HttpResponse::TooManyRequests().json(serde_json::json!({
            "error": "Too Many Requests",
            "message": "Rate limit exceeded. Please try again later."
        })));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn limiter(max_requests: usize, period_seconds: u64) -> SimpleRateLimiter {
        SimpleRateLimiter::new(RateLimitConfig {
            max_requests,
            period_seconds,
        })
    }

    #[test]
    fn test_limit_per_key() {
        let limiter = limiter(2, 60);
        assert!(limiter.check_rate_limit("10.0.0.1"));
        assert!(limiter.check_rate_limit("10.0.0.1"));
        assert!(!limiter.check_rate_limit("10.0.0.1"));
        assert!(limiter.check_rate_limit("10.0.0.2"));
    }

    #[test]
    fn test_window_expires() {
        let limiter = limiter(1, 0);
        assert!(limiter.check_rate_limit("10.0.0.1"));
        assert!(limiter.check_rate_limit("10.0.0.1"));
    }

    #[test]
    fn test_enforce_keys_by_peer_address() {
        let limiter = limiter(1, 60);
        let request = |forwarded: &str| {
            TestRequest::default()
                .peer_addr("203.0.113.9:4000".parse().unwrap())
                .insert_header(("X-Forwarded-For", forwarded))
                .to_http_request()
        };

        assert!(enforce_rate_limit(&request("198.51.100.1"), &limiter).is_ok());
        let rejected = enforce_rate_limit(&request("198.51.100.2"), &limiter).unwrap_err();
        assert_eq!(rejected.status(), 429);
        assert!(!limiter.check_rate_limit("203.0.113.9"));
        assert!(limiter.check_rate_limit("198.51.100.2"));
    }

    #[test]
    fn test_enforce_behind_trusted_proxy() {
        let limiter = limiter(1, 60);
        let request = |forwarded: &str| {
            TestRequest::default()
                .app_data(actix_web::web::Data::new(crate::config::ProxyConfig {
                    trust_forwarded_headers: true,
                }))
                .peer_addr("10.0.0.1:4000".parse().unwrap())
                .insert_header(("X-Forwarded-For", forwarded))
                .to_http_request()
        };

        assert!(enforce_rate_limit(&request("198.51.100.1"), &limiter).is_ok());
        assert!(enforce_rate_limit(&request("198.51.100.2"), &limiter).is_ok());
        assert!(enforce_rate_limit(&request("198.51.100.1"), &limiter).is_err());
    }
}
