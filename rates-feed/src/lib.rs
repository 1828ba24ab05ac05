//! Upstream Exchange Rate Feed
//!
//! HTTP client for a "latest rates" endpoint in the exchangerate-api.com v4
//! format, plus the normalization that turns its quotes into rate-to-base
//! values for the system's base currency.
//!
//! # Normalization
//! The upstream quotes every currency X relative to its own base U
//! (`1 U = quote(X) X`). The rate of X expressed in the system base B is the
//! cross-rate through U:
//!
//! ```text
//! rate_to_B(X) = quote(B) / quote(X)
//! ```
//!
//! # Example
//! ```ignore
//! use rates_feed::{ExchangeRateApiClient, FeedConfig};
//! use rates_types::{CurrencyCode, RateFeed};
//!
//! let client = ExchangeRateApiClient::new(FeedConfig::new(CurrencyCode::TWD))?;
//! let quotes = client.fetch_latest_rates().await; // empty on any upstream failure
//! ```

use std::collections::HashMap;
use std::str::FromStr;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use rates_types::{CurrencyCode, FeedError, RateFeed, RateQuotes, round_rate};

/// Default upstream endpoint (quotes relative to USD).
pub const DEFAULT_FEED_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Feed client configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    /// The system base currency quotes are normalized to.
    pub base: CurrencyCode,
    pub connect_timeout: Duration,
    /// Upper bound for the whole request, including reading the body.
    pub request_timeout: Duration,
}

impl FeedConfig {
    pub fn new(base: CurrencyCode) -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            base,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

/// Upstream response body. Unknown fields are ignored.
///
/// `rates` is kept loosely typed so a malformed map can be reported as
/// "no data" instead of failing deserialization of the whole body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangeRateResponse {
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub rates: Option<serde_json::Value>,
}

fn quote_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        // f64 Display never uses exponent notation, so it always parses
        serde_json::Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .and_then(|f| Decimal::from_str(&f.to_string()).ok()),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Converts upstream quotes into rate-to-base values for `base`.
///
/// Fails if `rates` is absent or malformed, or if the quote for `base` is
/// missing or not positive. Individual entries that are not numeric or not
/// positive are dropped.
pub fn normalize_quotes(
    payload: &ExchangeRateResponse,
    base: CurrencyCode,
) -> Result<RateQuotes, FeedError> {
    let raw = payload
        .rates
        .as_ref()
        .and_then(|rates| rates.as_object())
        .ok_or_else(|| FeedError::InvalidPayload("missing or malformed `rates`".into()))?;

    let mut quotes: HashMap<String, Decimal> = HashMap::with_capacity(raw.len() + 1);
    for (code, value) in raw {
        match quote_from_json(value) {
            Some(quote) if quote > Decimal::ZERO => {
                quotes.insert(code.trim().to_uppercase(), quote);
            }
            _ => debug!(code = %code, value = %value, "Dropping unusable upstream quote"),
        }
    }

    // The upstream base is implicitly quoted at 1 against itself
    if let Some(upstream_base) = payload.base.as_deref() {
        let upstream_base = upstream_base.trim().to_uppercase();
        if !upstream_base.is_empty() {
            quotes.entry(upstream_base).or_insert(Decimal::ONE);
        }
    }

    let base_quote = quotes
        .get(base.code())
        .copied()
        .ok_or(FeedError::BaseCurrencyMissing(base))?;

    let mut normalized = RateQuotes::with_capacity(quotes.len());
    for (code, quote) in quotes {
        match base_quote.checked_div(quote) {
            Some(rate) => {
                normalized.insert(code, round_rate(rate));
            }
            None => debug!(code = %code, "Cross-rate overflowed, dropping quote"),
        }
    }

    Ok(normalized)
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP client
// ─────────────────────────────────────────────────────────────────────────────

/// exchangerate-api.com feed client.
pub struct ExchangeRateApiClient {
    http: reqwest::Client,
    config: FeedConfig,
}

impl ExchangeRateApiClient {
    /// Builds the client with the configured timeouts.
    pub fn new(config: FeedConfig) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FeedError::UpstreamUnavailable(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Fetches and normalizes quotes, reporting why when nothing usable came back.
    pub async fn try_fetch(&self) -> Result<RateQuotes, FeedError> {
        let started = Instant::now();

        let response = self
            .http
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| FeedError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UpstreamUnavailable(format!("HTTP {}", status)));
        }

        let payload: ExchangeRateResponse = response
            .json()
            .await
            .map_err(|e| FeedError::InvalidPayload(e.to_string()))?;

        debug!(
            upstream_base = payload.base.as_deref().unwrap_or("?"),
            date = payload.date.as_deref().unwrap_or("?"),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream responded"
        );

        normalize_quotes(&payload, self.config.base)
    }
}

#[async_trait::async_trait]
impl RateFeed for ExchangeRateApiClient {
    fn name(&self) -> &str {
        "exchangerate-api"
    }

    async fn fetch_latest_rates(&self) -> RateQuotes {
        match self.try_fetch().await {
            Ok(quotes) => {
                info!(
                    url = %self.config.url,
                    count = quotes.len(),
                    "Fetched latest rates"
                );
                quotes
            }
            Err(e) => {
                warn!(url = %self.config.url, error = %e, "Rate feed returned no usable data");
                RateQuotes::new()
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
