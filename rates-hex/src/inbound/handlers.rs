//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use rates_types::{
    AppError, ConvertRequest, CurrencyCode, EvictResponse, RefreshAccepted, SetRateRequest,
};

use crate::RateService;

/// Application state shared across handlers.
pub struct AppState {
    pub service: RateService,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

fn parse_code(code: &str) -> Result<CurrencyCode, ApiError> {
    code.parse::<CurrencyCode>()
        .map_err(|e| AppError::from(e).into())
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Currencies
// ─────────────────────────────────────────────────────────────────────────────

/// List all stored rates.
#[tracing::instrument(skip(state))]
pub async fn list_currencies(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let rates = state.service.list_rates().await?;
    Ok(Json(rates))
}

/// Get the rate for one currency.
#[tracing::instrument(skip(state), fields(code = %code))]
pub async fn get_currency(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let code = parse_code(&code)?;
    let rate = state.service.get_rate(code).await?;
    Ok(Json(rate))
}

/// Create or overwrite the rate for one currency.
#[tracing::instrument(skip(state), fields(code = %code, rate = %req.rate_to_base))]
pub async fn set_currency_rate(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(req): Json<SetRateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let code = parse_code(&code)?;
    let rate = state.service.set_rate(code, req).await?;
    Ok(Json(rate))
}

/// Delete the rate for one currency.
#[tracing::instrument(skip(state), fields(code = %code))]
pub async fn delete_currency(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let code = parse_code(&code)?;
    state.service.delete_rate(code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Convert an amount between two currencies.
#[tracing::instrument(skip(state), fields(from = %req.from, to = %req.to, amount = %req.amount))]
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ConvertRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.service.convert(req).await?;
    Ok(Json(response))
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache
// ─────────────────────────────────────────────────────────────────────────────

/// Evict every cached rate.
#[tracing::instrument(skip(state))]
pub async fn evict_all(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let evicted = state.service.evict_all().await?;
    Ok(Json(EvictResponse { evicted }))
}

/// Evict the cached rate of one currency.
#[tracing::instrument(skip(state), fields(code = %code))]
pub async fn evict_currency(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let code = parse_code(&code)?;
    let evicted = state.service.evict(code).await?;
    Ok(Json(EvictResponse { evicted }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Refresh
// ─────────────────────────────────────────────────────────────────────────────

/// Queue a manual refresh.
#[tracing::instrument(skip(state))]
pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.service.trigger_refresh()?;

    Ok((
        StatusCode::ACCEPTED,
        Json(RefreshAccepted {
            status: "queued".into(),
            message: "Rate refresh queued".into(),
        }),
    ))
}

pub async fn auto_update_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.auto_update_status())
}

#[tracing::instrument(skip(state))]
pub async fn enable_auto_update(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let status = state.service.enable_auto_update()?;
    Ok(Json(status))
}

#[tracing::instrument(skip(state))]
pub async fn disable_auto_update(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.service.disable_auto_update())
}
