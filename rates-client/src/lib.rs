//! # Rates Client SDK
//!
//! A typed Rust client for the currency rates admin API.

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use rates_types::{
    AutoUpdateStatus, ConvertRequest, ConvertResponse, CurrencyCode, EvictResponse, RateRecord,
    RefreshAccepted, SetRateRequest,
};

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// True when the API answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }
}

/// Rates API client.
pub struct RatesClient {
    base_url: String,
    http: Client,
}

impl RatesClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Currencies
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lists every stored rate.
    pub async fn list_currencies(&self) -> Result<Vec<RateRecord>, ClientError> {
        self.get("/api/currencies").await
    }

    /// Gets the rate of one currency.
    pub async fn get_currency(&self, code: CurrencyCode) -> Result<RateRecord, ClientError> {
        self.get(&format!("/api/currencies/{}", code)).await
    }

    /// Creates or overwrites the rate of one currency.
    pub async fn set_rate(
        &self,
        code: CurrencyCode,
        rate_to_base: Decimal,
    ) -> Result<RateRecord, ClientError> {
        let req = SetRateRequest { rate_to_base };
        let resp = self
            .http
            .put(format!("{}/api/currencies/{}", self.base_url, code))
            .json(&req)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    /// Deletes the rate of one currency.
    pub async fn delete_currency(&self, code: CurrencyCode) -> Result<(), ClientError> {
        let resp = self
            .http
            .delete(format!("{}/api/currencies/{}", self.base_url, code))
            .send()
            .await?;

        if resp.status() == StatusCode::NO_CONTENT || resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(resp).await)
        }
    }

    /// Converts an amount between two currencies.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<ConvertResponse, ClientError> {
        let req = ConvertRequest { amount, from, to };
        self.post("/api/currencies/convert", &req).await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Cache & Refresh
    // ─────────────────────────────────────────────────────────────────────────────

    /// Evicts the cached rate of one currency, or every cached rate.
    pub async fn evict(&self, code: Option<CurrencyCode>) -> Result<EvictResponse, ClientError> {
        let path = match code {
            Some(code) => format!("/api/currencies/{}/cache/evict", code),
            None => "/api/currencies/cache/evict".to_string(),
        };
        self.post_empty(&path).await
    }

    /// Queues a refresh from the upstream feed.
    pub async fn refresh(&self) -> Result<RefreshAccepted, ClientError> {
        self.post_empty("/api/currencies/refresh").await
    }

    pub async fn auto_update_status(&self) -> Result<AutoUpdateStatus, ClientError> {
        self.get("/api/currencies/auto-update/status").await
    }

    pub async fn enable_auto_update(&self) -> Result<AutoUpdateStatus, ClientError> {
        self.post_empty("/api/currencies/auto-update/enable").await
    }

    pub async fn disable_auto_update(&self) -> Result<AutoUpdateStatus, ClientError> {
        self.post_empty("/api/currencies/auto-update/disable").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        if resp.status().is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(Self::api_error(resp).await)
        }
    }

    async fn api_error(resp: reqwest::Response) -> ClientError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or(body);
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}
