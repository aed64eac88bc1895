//! Server, proxy, metrics and rate limiting configuration.

use std::env;

/// Listener and log output settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Emit logs as JSON lines instead of human-readable text
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            json_logs: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env::var("SERVER_HOST").unwrap_or(defaults.host),
            port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            json_logs: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.json_logs),
        }
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

/// Whether client addresses may be taken from proxy headers.
///
/// Only enable behind a reverse proxy that overwrites `X-Forwarded-For` and
/// friends; otherwise callers can claim any address.
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    pub trust_forwarded_headers: bool,
}

impl ProxyConfig {
    pub fn from_env() -> Self {
        let trust_forwarded_headers = env::var("TRUST_PROXY_HEADERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(false);

        Self {
            trust_forwarded_headers,
        }
    }
}

/// Configuration for application metrics collection
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl MetricsConfig {
    pub fn from_env() -> Self {
        let enabled = env::var("METRICS_ENABLED")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(true);

        Self { enabled }
    }
}

/// Request budget for the narrative endpoint, per client address
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub period_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            period_seconds: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_requests: env::var("NARRATIVE_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_requests),
            period_seconds: env::var("NARRATIVE_RATE_LIMIT_PERIOD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.period_seconds),
        }
    }
}
