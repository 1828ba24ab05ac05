//! Database row types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use rates_types::{CurrencyCode, RateRecord, RepoError};

/// Rate row from database.
///
/// SQLite has no decimal type; the rate is kept as its exact decimal string
/// and the timestamp as RFC 3339 text.
#[derive(FromRow)]
pub struct DbRateRecord {
    pub currency_code: String,
    pub rate_to_base: String,
    pub last_update: String,
}

impl DbRateRecord {
    pub fn from_domain(record: &RateRecord) -> Self {
        Self {
            currency_code: record.code.code().to_string(),
            rate_to_base: record.rate_to_base.to_string(),
            last_update: record.last_update.to_rfc3339(),
        }
    }

    /// Converts the row back into a record without re-validating the rate.
    pub fn into_domain(self) -> Result<RateRecord, RepoError> {
        let code: CurrencyCode = self.currency_code.parse()?;

        let rate = Decimal::from_str(&self.rate_to_base).map_err(|e| {
            RepoError::Database(format!(
                "Corrupt rate for {}: {} ({})",
                code, self.rate_to_base, e
            ))
        })?;

        let last_update = DateTime::parse_from_rfc3339(&self.last_update)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                RepoError::Database(format!(
                    "Corrupt timestamp for {}: {} ({})",
                    code, self.last_update, e
                ))
            })?;

        Ok(RateRecord::from_parts(code, rate, last_update))
    }
}
