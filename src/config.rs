//! Environment-driven configuration

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// What to do with a stay whose check-out is not after its check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StayRangePolicy {
    /// Fail with an invalid-range error.
    Reject,
    /// Charge a single night, the way legacy quotes behaved.
    Clamp,
}

impl FromStr for StayRangePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "clamp" => Ok(Self::Clamp),
            other => Err(format!("unknown stay range policy '{other}'")),
        }
    }
}

/// What booking creation does when an external calendar cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFailurePolicy {
    FailClosed,
    Degrade,
}

impl FromStr for FeedFailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fail_closed" | "closed" => Ok(Self::FailClosed),
            "degrade" => Ok(Self::Degrade),
            other => Err(format!("unknown feed failure policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub feed_timeout: Duration,
    pub feed_failure_policy: FeedFailurePolicy,
    pub stay_range_policy: StayRangePolicy,
    pub apartment_cache_ttl: Duration,
    pub invoice_prefix: String,
    pub default_currency: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_parse_or("PORT", 8000),
            database_url: env_opt("DATABASE_URL"),
            db_max_connections: env_parse_or("DB_MAX_CONNECTIONS", 10),
            feed_timeout: Duration::from_secs(env_parse_or("FEED_TIMEOUT_SECONDS", 20)),
            feed_failure_policy: env_parse_or("FEED_FAILURE_POLICY", FeedFailurePolicy::FailClosed),
            stay_range_policy: env_parse_or("STAY_RANGE_POLICY", StayRangePolicy::Reject),
            apartment_cache_ttl: Duration::from_secs(env_parse_or(
                "APARTMENT_CACHE_TTL_SECONDS",
                60,
            )),
            invoice_prefix: env_or("INVOICE_PREFIX", "INV"),
            default_currency: env_or("DEFAULT_CURRENCY", "EUR"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            database_url: None,
            db_max_connections: 10,
            feed_timeout: Duration::from_secs(20),
            feed_failure_policy: FeedFailurePolicy::FailClosed,
            stay_range_policy: StayRangePolicy::Reject,
            apartment_cache_ttl: Duration::from_secs(60),
            invoice_prefix: "INV".to_string(),
            default_currency: "EUR".to_string(),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env_opt(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
            default
        }),
        None => default,
    }
}
