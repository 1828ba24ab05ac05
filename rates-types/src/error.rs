//! Error types for the currency rate service.

use rust_decimal::Decimal;

use crate::domain::CurrencyCode;

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Invalid rate for {code}: {rate} (rate must be greater than zero)")]
    InvalidRate { code: CurrencyCode, rate: Decimal },

    #[error("Currency not found: {0}")]
    CurrencyNotFound(CurrencyCode),

    #[error("Stored rate for {code} violates the positive-rate invariant: {rate}")]
    InvalidRateState { code: CurrencyCode, rate: Decimal },

    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

/// Upstream feed failures.
///
/// These never reach conversion callers; the feed adapter logs them and
/// reports "no update available".
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream response has no quote for base currency {0}")]
    BaseCurrencyMissing(CurrencyCode),

    #[error("Invalid upstream payload: {0}")]
    InvalidPayload(String),
}

/// Refresh scheduler errors.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    #[error("Refresh queue is full")]
    QueueFull,

    #[error("Scheduler is stopped")]
    Stopped,
}

/// Application-level errors (for HTTP responses).
///
/// Maps cleanly to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::CurrencyNotFound(code) => {
                AppError::NotFound(format!("Currency not found: {}", code))
            }
            DomainError::InvalidRateState { .. } => AppError::Internal(err.to_string()),
            DomainError::InvalidRate { .. } | DomainError::UnsupportedCurrency(_) => {
                AppError::BadRequest(err.to_string())
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Cache(e) => AppError::Internal(e),
        }
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::QueueFull => AppError::TooManyRequests(err.to_string()),
            SchedulerError::Stopped | SchedulerError::InvalidConfig(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err: AppError = RepoError::Domain(DomainError::CurrencyNotFound(CurrencyCode::USD)).into();
        assert!(matches!(err, AppError::NotFound(msg) if msg.contains("USD")));
    }

    #[test]
    fn test_invalid_rate_state_is_internal() {
        let err: AppError = DomainError::InvalidRateState {
            code: CurrencyCode::EUR,
            rate: dec!(0),
        }
        .into();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_invalid_rate_is_bad_request() {
        let err: AppError = RepoError::from(DomainError::InvalidRate {
            code: CurrencyCode::EUR,
            rate: dec!(-1),
        })
        .into();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_queue_full_is_too_many_requests() {
        let err: AppError = SchedulerError::QueueFull.into();
        assert!(matches!(err, AppError::TooManyRequests(_)));
    }
}
