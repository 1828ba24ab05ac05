//! Configuration loading from environment.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use rates_feed::{DEFAULT_FEED_URL, FeedConfig};
use rates_hex::SchedulerConfig;
use rates_types::CurrencyCode;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/rates.db?mode=rwc";

/// Longest accepted cache TTL.
const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub base_currency: CurrencyCode,
    pub feed_url: String,
    pub feed_connect_timeout: Duration,
    pub feed_timeout: Duration,
    pub cache_ttl: Duration,
    pub refresh_interval: Duration,
    pub refresh_align: bool,
    pub auto_update: bool,
    pub refresh_workers: usize,
    pub refresh_queue: usize,
    /// OTLP collector endpoint; tracing export is off when unset.
    pub otel_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration from any key lookup. Unset keys take defaults;
    /// malformed values are errors naming the variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            port: parse(&var, "PORT", 3000)?,
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            base_currency: parse(&var, "BASE_CURRENCY", CurrencyCode::TWD)?,
            feed_url: var("RATE_FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            feed_connect_timeout: secs(&var, "RATE_FEED_CONNECT_TIMEOUT_SECS", 5)?,
            feed_timeout: secs(&var, "RATE_FEED_TIMEOUT_SECS", 10)?,
            cache_ttl: bounded_secs(&var, "RATE_CACHE_TTL_SECS", 24 * 60 * 60, MAX_CACHE_TTL)?,
            refresh_interval: secs(&var, "RATE_REFRESH_INTERVAL_SECS", 60 * 60)?,
            refresh_align: flag(&var, "RATE_REFRESH_ALIGN", true)?,
            auto_update: flag(&var, "RATE_AUTO_UPDATE", true)?,
            refresh_workers: parse(&var, "RATE_REFRESH_WORKERS", 2)?,
            refresh_queue: parse(&var, "RATE_REFRESH_QUEUE", 8)?,
            otel_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            url: self.feed_url.clone(),
            base: self.base_currency,
            connect_timeout: self.feed_connect_timeout,
            request_timeout: self.feed_timeout,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            period: self.refresh_interval,
            align_to_period: self.refresh_align,
            auto_update: self.auto_update,
            workers: self.refresh_workers,
            queue_capacity: self.refresh_queue,
        }
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid {}: {:?}", name, raw)),
        None => Ok(default),
    }
}

fn secs(var: &impl Fn(&str) -> Option<String>, name: &str, default: u64) -> anyhow::Result<Duration> {
    parse(var, name, default).map(Duration::from_secs)
}

fn bounded_secs(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
    max: Duration,
) -> anyhow::Result<Duration> {
    let value = secs(var, name, default)?;
    if value > max {
        anyhow::bail!(
            "Invalid {}: {}s exceeds the maximum of {}s",
            name,
            value.as_secs(),
            max.as_secs()
        );
    }
    Ok(value)
}

fn flag(var: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> anyhow::Result<bool> {
    match var(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "true" | "1" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "false" | "0" | "no" | "off") => Ok(false),
        Some(v) => anyhow::bail!("Invalid {}: {:?} (expected true or false)", name, v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.base_currency, CurrencyCode::TWD);
        assert_eq!(config.feed_url, DEFAULT_FEED_URL);
        assert_eq!(config.feed_connect_timeout, Duration::from_secs(5));
        assert_eq!(config.feed_timeout, Duration::from_secs(10));
        assert_eq!(config.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.refresh_interval, Duration::from_secs(3_600));
        assert!(config.refresh_align);
        assert!(config.auto_update);
        assert_eq!(config.refresh_workers, 2);
        assert_eq!(config.refresh_queue, 8);
        assert!(config.otel_endpoint.is_none());
        assert!(config.scheduler_config().validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "memory://"),
            ("BASE_CURRENCY", "usd"),
            ("RATE_REFRESH_INTERVAL_SECS", "600"),
            ("RATE_AUTO_UPDATE", "false"),
            ("RATE_REFRESH_ALIGN", "0"),
            ("RATE_REFRESH_WORKERS", "4"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "memory://");
        assert_eq!(config.base_currency, CurrencyCode::USD);
        assert_eq!(config.feed_config().base, CurrencyCode::USD);

        let scheduler = config.scheduler_config();
        assert_eq!(scheduler.period, Duration::from_secs(600));
        assert!(!scheduler.auto_update);
        assert!(!scheduler.align_to_period);
        assert_eq!(scheduler.workers, 4);
    }

    #[test]
    fn test_cache_ttl_accepts_the_maximum() {
        let config = load(&[("RATE_CACHE_TTL_SECS", "31536000")]).unwrap();
        assert_eq!(config.cache_ttl, MAX_CACHE_TTL);
    }

    #[test]
    fn test_blank_values_take_defaults() {
        let config = load(&[("PORT", "  "), ("OTEL_EXPORTER_OTLP_ENDPOINT", "")]).unwrap();

        assert_eq!(config.port, 3000);
        assert!(config.otel_endpoint.is_none());
    }

    #[test]
    fn test_malformed_values_name_the_variable() {
        for (name, value) in [
            ("PORT", "eighty"),
            ("BASE_CURRENCY", "XYZ"),
            ("RATE_CACHE_TTL_SECS", "-1"),
            ("RATE_CACHE_TTL_SECS", "18446744073709551615"),
            ("RATE_CACHE_TTL_SECS", "31536001"),
            ("RATE_AUTO_UPDATE", "maybe"),
        ] {
            let err = load(&[(name, value)]).unwrap_err();
            assert!(format!("{:#}", err).contains(name), "{}", err);
        }
    }
}
