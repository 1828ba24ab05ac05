//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use rates_types::domain::{CurrencyCode, RateRecord};
use rates_types::dto::{
    AutoUpdateStatus, ConvertRequest, ConvertResponse, EvictResponse, RefreshAccepted,
    RefreshOutcome, RefreshReport, RefreshTrigger, SchedulerPhase, SetRateRequest,
};
use utoipa::OpenApi;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// List all stored rates
#[utoipa::path(
    get,
    path = "/api/currencies",
    tag = "currencies",
    responses(
        (status = 200, description = "Stored rates ordered by code", body = Vec<RateRecord>)
    )
)]
async fn list_currencies() {}

/// Get the rate of one currency
#[utoipa::path(
    get,
    path = "/api/currencies/{code}",
    tag = "currencies",
    params(
        ("code" = String, Path, description = "ISO currency code, case-insensitive")
    ),
    responses(
        (status = 200, description = "Rate record", body = RateRecord),
        (status = 400, description = "Unsupported currency code"),
        (status = 404, description = "No rate stored for this currency")
    )
)]
async fn get_currency() {}

/// Create or overwrite the rate of one currency
#[utoipa::path(
    put,
    path = "/api/currencies/{code}",
    tag = "currencies",
    request_body = SetRateRequest,
    params(
        ("code" = String, Path, description = "ISO currency code, case-insensitive")
    ),
    responses(
        (status = 200, description = "Rate saved", body = RateRecord),
        (status = 400, description = "Invalid rate or unsupported currency code")
    )
)]
async fn set_currency_rate() {}

/// Delete the rate of one currency
#[utoipa::path(
    delete,
    path = "/api/currencies/{code}",
    tag = "currencies",
    params(
        ("code" = String, Path, description = "ISO currency code, case-insensitive")
    ),
    responses(
        (status = 204, description = "Rate deleted"),
        (status = 404, description = "No rate stored for this currency")
    )
)]
async fn delete_currency() {}

/// Convert an amount between two currencies
#[utoipa::path(
    post,
    path = "/api/currencies/convert",
    tag = "conversion",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Converted amount, rounded half-up to 2 decimal places", body = ConvertResponse),
        (status = 400, description = "Invalid amount or currency"),
        (status = 404, description = "A rate needed for the conversion is missing")
    )
)]
async fn convert() {}

/// Evict every cached rate
#[utoipa::path(
    post,
    path = "/api/currencies/cache/evict",
    tag = "cache",
    responses(
        (status = 200, description = "Cache entries removed", body = EvictResponse)
    )
)]
async fn evict_all() {}

/// Evict the cached rate of one currency
#[utoipa::path(
    post,
    path = "/api/currencies/{code}/cache/evict",
    tag = "cache",
    params(
        ("code" = String, Path, description = "ISO currency code, case-insensitive")
    ),
    responses(
        (status = 200, description = "Cache entries removed", body = EvictResponse),
        (status = 400, description = "Unsupported currency code")
    )
)]
async fn evict_currency() {}

/// Queue a rate refresh from the upstream feed
#[utoipa::path(
    post,
    path = "/api/currencies/refresh",
    tag = "refresh",
    responses(
        (status = 202, description = "Refresh queued", body = RefreshAccepted),
        (status = 429, description = "Refresh queue is full")
    )
)]
async fn refresh() {}

/// Automatic refresh status
#[utoipa::path(
    get,
    path = "/api/currencies/auto-update/status",
    tag = "refresh",
    responses(
        (status = 200, description = "Scheduler status", body = AutoUpdateStatus)
    )
)]
async fn auto_update_status() {}

/// Enable automatic refreshes (runs one refresh right away)
#[utoipa::path(
    post,
    path = "/api/currencies/auto-update/enable",
    tag = "refresh",
    responses(
        (status = 200, description = "Scheduler status", body = AutoUpdateStatus)
    )
)]
async fn enable_auto_update() {}

/// Disable automatic refreshes
#[utoipa::path(
    post,
    path = "/api/currencies/auto-update/disable",
    tag = "refresh",
    responses(
        (status = 200, description = "Scheduler status", body = AutoUpdateStatus)
    )
)]
async fn disable_auto_update() {}

/// OpenAPI documentation for the Rates API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Currency Rates Service API",
        version = "1.0.0",
        description = "Currency rate table kept fresh from an upstream feed, with cached lookups and two-hop conversion through the base currency.\n\nRates are expressed as units of base currency per one unit of the currency, with 6 decimal places. Converted amounts use 2 decimal places, rounded half-up.",
        license(name = "MIT"),
    ),
    paths(
        health,
        list_currencies,
        get_currency,
        set_currency_rate,
        delete_currency,
        convert,
        evict_all,
        evict_currency,
        refresh,
        auto_update_status,
        enable_auto_update,
        disable_auto_update,
    ),
    components(
        schemas(
            CurrencyCode,
            RateRecord,
            SetRateRequest,
            ConvertRequest,
            ConvertResponse,
            EvictResponse,
            RefreshAccepted,
            RefreshTrigger,
            RefreshOutcome,
            RefreshReport,
            SchedulerPhase,
            AutoUpdateStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "currencies", description = "Rate table management"),
        (name = "conversion", description = "Amount conversion"),
        (name = "cache", description = "Rate cache maintenance"),
        (name = "refresh", description = "Upstream refresh control"),
    )
)]
pub struct ApiDoc;
