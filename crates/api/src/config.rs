use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use hermes_core::publish::{
    NoticeRoute, DEFAULT_ERROR_SUBJECT, DEFAULT_ERROR_TOPIC, DEFAULT_NOTICE_SUBJECT,
    DEFAULT_NOTICE_TOPIC, DEFAULT_SENDER,
};
use hermes_core::rate_limit::RateLimiter;
use hermes_db::store::DEFAULT_MAX_LOG_MESSAGE_BYTES;
use hermes_delivery::orchestrator::{DEFAULT_DISPATCH_CONCURRENCY, DEFAULT_DISPATCH_TIMEOUT};
use hermes_delivery::{PublisherConfig, ResolutionStrategy};

/// Where subscribers and the message log are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local maps. Data is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Prefix every gateway route is mounted under (default: `/hermes`).
    pub root_path: String,
    /// Bearer key required on gateway routes when set.
    pub api_key: Option<String>,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub gateway: GatewayConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `5000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `ROOT_PATH`            | `/hermes`                  |
    /// | `API_KEY`              | unset (no auth)            |
    /// | `STORE_BACKEND`        | `postgres`                 |
    /// | `DATABASE_URL`         | required for `postgres`    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let root_path = normalize_root(
            &std::env::var("ROOT_PATH").unwrap_or_else(|_| "/hermes".into()),
        );

        let api_key = std::env::var("API_KEY").ok().filter(|k| !k.is_empty());

        let store_backend: StoreBackend = std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .parse()
            .expect("STORE_BACKEND must be 'postgres' or 'memory'");

        let database_url = std::env::var("DATABASE_URL").ok();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            root_path,
            api_key,
            store_backend,
            database_url,
            gateway: GatewayConfig::from_env(),
        }
    }
}

/// `""` for the root, otherwise a path with one leading and no trailing slash.
pub fn normalize_root(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Publish pipeline settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub publish_rate_limit: usize,
    pub publish_rate_window_secs: i64,
    pub sender: String,
    pub resolution_strategy: ResolutionStrategy,
    /// Topic added to every publish, e.g. `All`.
    pub broadcast_topic: Option<String>,
    pub dispatch_concurrency: usize,
    pub dispatch_timeout_secs: u64,
    pub error_topic: String,
    pub notice_topic: String,
    pub max_log_message_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            publish_rate_limit: 40,
            publish_rate_window_secs: 3600,
            sender: DEFAULT_SENDER.to_string(),
            resolution_strategy: ResolutionStrategy::default(),
            broadcast_topic: None,
            dispatch_concurrency: DEFAULT_DISPATCH_CONCURRENCY,
            dispatch_timeout_secs: DEFAULT_DISPATCH_TIMEOUT.as_secs(),
            error_topic: DEFAULT_ERROR_TOPIC.to_string(),
            notice_topic: DEFAULT_NOTICE_TOPIC.to_string(),
            max_log_message_bytes: DEFAULT_MAX_LOG_MESSAGE_BYTES,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                                       |
    /// |----------------------------|-----------------------------------------------|
    /// | `PUBLISH_RATE_LIMIT`       | `40`                                          |
    /// | `PUBLISH_RATE_WINDOW_SECS` | `3600`                                        |
    /// | `SENDER`                   | `Notifications <notifications@hermes.local>`  |
    /// | `RESOLUTION_STRATEGY`      | `scan` (`scan` or `index`)                    |
    /// | `BROADCAST_TOPIC`          | unset                                         |
    /// | `DISPATCH_CONCURRENCY`     | `16`                                          |
    /// | `DISPATCH_TIMEOUT_SECS`    | `10`                                          |
    /// | `ERROR_TOPIC`              | `error-reporting`                             |
    /// | `NOTICE_TOPIC`             | `notify-dev`                                  |
    /// | `MAX_LOG_MESSAGE_BYTES`    | `65536`                                       |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            publish_rate_limit: env_parse("PUBLISH_RATE_LIMIT", defaults.publish_rate_limit),
            publish_rate_window_secs: env_parse(
                "PUBLISH_RATE_WINDOW_SECS",
                defaults.publish_rate_window_secs,
            ),
            sender: std::env::var("SENDER").unwrap_or(defaults.sender),
            resolution_strategy: std::env::var("RESOLUTION_STRATEGY")
                .map(|v| {
                    v.parse()
                        .expect("RESOLUTION_STRATEGY must be 'scan' or 'index'")
                })
                .unwrap_or(defaults.resolution_strategy),
            broadcast_topic: std::env::var("BROADCAST_TOPIC")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            dispatch_concurrency: env_parse("DISPATCH_CONCURRENCY", defaults.dispatch_concurrency),
            dispatch_timeout_secs: env_parse(
                "DISPATCH_TIMEOUT_SECS",
                defaults.dispatch_timeout_secs,
            ),
            error_topic: std::env::var("ERROR_TOPIC").unwrap_or(defaults.error_topic),
            notice_topic: std::env::var("NOTICE_TOPIC").unwrap_or(defaults.notice_topic),
            max_log_message_bytes: env_parse(
                "MAX_LOG_MESSAGE_BYTES",
                defaults.max_log_message_bytes,
            ),
        }
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(
            self.publish_rate_limit,
            TimeDelta::seconds(self.publish_rate_window_secs),
        )
    }

    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            default_sender: self.sender.clone(),
            dispatch_concurrency: self.dispatch_concurrency.max(1),
            dispatch_timeout: Duration::from_secs(self.dispatch_timeout_secs),
            error_route: NoticeRoute {
                topic: self.error_topic.clone(),
                default_subject: DEFAULT_ERROR_SUBJECT.to_string(),
            },
            notice_route: NoticeRoute {
                topic: self.notice_topic.clone(),
                default_subject: DEFAULT_NOTICE_SUBJECT.to_string(),
            },
        }
    }
}

/// Parse `key` when set, panicking on a malformed value.
fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} is invalid: {e}")),
        Err(_) => default,
    }
}
