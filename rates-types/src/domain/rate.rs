//! Rate-to-base records and the rounding policy shared by every layer.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::currency::CurrencyCode;
use crate::error::DomainError;

/// Fractional digits kept for a rate-to-base value.
pub const RATE_SCALE: u32 = 6;

/// Fractional digits of a converted monetary amount.
pub const AMOUNT_SCALE: u32 = 2;

/// Rounds a rate half-up to [`RATE_SCALE`] digits.
pub fn round_rate(rate: Decimal) -> Decimal {
    rate.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds an amount half-up to [`AMOUNT_SCALE`] digits.
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// The current rate of one currency expressed in the base currency.
///
/// One record exists per currency code; refreshes and manual updates
/// overwrite it in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RateRecord {
    pub code: CurrencyCode,
    /// Units of base currency per one unit of `code`
    #[schema(value_type = String, example = "31.25")]
    pub rate_to_base: Decimal,
    pub last_update: DateTime<Utc>,
}

impl RateRecord {
    /// Creates a validated record stamped with the current time.
    ///
    /// The rate is rounded to [`RATE_SCALE`] digits first; a result that is
    /// not strictly positive is rejected.
    pub fn new(code: CurrencyCode, rate_to_base: Decimal) -> Result<Self, DomainError> {
        let rate_to_base = round_rate(rate_to_base);
        if rate_to_base <= Decimal::ZERO {
            return Err(DomainError::InvalidRate {
                code,
                rate: rate_to_base,
            });
        }
        Ok(Self {
            code,
            rate_to_base,
            last_update: Utc::now(),
        })
    }

    /// Reconstructs a record from storage without validation.
    pub fn from_parts(code: CurrencyCode, rate_to_base: Decimal, last_update: DateTime<Utc>) -> Self {
        Self {
            code,
            rate_to_base,
            last_update,
        }
    }

    /// Returns true if the record satisfies the positive-rate invariant.
    pub fn is_valid(&self) -> bool {
        self.rate_to_base > Decimal::ZERO
    }

    /// Fails with `InvalidRate` if the record must not be persisted.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(DomainError::InvalidRate {
                code: self.code,
                rate: self.rate_to_base,
            })
        }
    }
}
