//! Conversion Engine
//!
//! Two-hop conversion through the base currency:
//!
//! ```text
//! amount(from) --x rate(from)--> amount(base) --/ rate(to)--> amount(to)
//! ```
//!
//! Converted amounts are rounded half-up to 2 decimal places. The division
//! step runs at full precision and is rounded once at the end.

use rust_decimal::Decimal;

use rates_types::{CurrencyCode, DomainError, RepoError, round_amount, round_rate};

use crate::repository::RateRepository;

/// Stateless converter backed by the rate repository.
#[derive(Clone)]
pub struct ConversionEngine {
    repo: RateRepository,
    base: CurrencyCode,
}

impl ConversionEngine {
    pub fn new(repo: RateRepository, base: CurrencyCode) -> Self {
        Self { repo, base }
    }

    pub fn base(&self) -> CurrencyCode {
        self.base
    }

    /// Converts `amount` of `from` into the base currency.
    pub async fn convert_to_base(
        &self,
        amount: Decimal,
        from: CurrencyCode,
    ) -> Result<Decimal, RepoError> {
        if from == self.base {
            return Ok(amount);
        }

        let rate = self.rate_of(from).await?;
        let converted = amount
            .checked_mul(rate)
            .ok_or(DomainError::InvalidRateState { code: from, rate })?;

        Ok(round_amount(converted))
    }

    /// Converts `amount` of `from` into `to`.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<Decimal, RepoError> {
        self.convert_with_quote(amount, from, to)
            .await
            .map(|(converted, _)| converted)
    }

    /// Effective rate for one unit of `from` expressed in `to`, 6 decimal places.
    pub async fn quote(&self, from: CurrencyCode, to: CurrencyCode) -> Result<Decimal, RepoError> {
        self.convert_with_quote(Decimal::ZERO, from, to)
            .await
            .map(|(_, rate)| rate)
    }

    /// Converts `amount` and returns it together with the effective rate.
    ///
    /// Each rate is read once, so the pair always agrees even if a refresh
    /// lands mid-call.
    pub async fn convert_with_quote(
        &self,
        amount: Decimal,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<(Decimal, Decimal), RepoError> {
        if from == to {
            return Ok((amount, Decimal::ONE));
        }

        let from_rate = self.base_rate(from).await?;
        let to_rate = self.base_rate(to).await?;

        let base_amount = if from == self.base {
            amount
        } else {
            let scaled = amount.checked_mul(from_rate).ok_or(DomainError::InvalidRateState {
                code: from,
                rate: from_rate,
            })?;
            round_amount(scaled)
        };

        let converted = if to == self.base {
            base_amount
        } else {
            let scaled = base_amount
                .checked_div(to_rate)
                .ok_or(DomainError::InvalidRateState { code: to, rate: to_rate })?;
            round_amount(scaled)
        };

        let rate = from_rate
            .checked_div(to_rate)
            .ok_or(DomainError::InvalidRateState { code: to, rate: to_rate })?;

        Ok((converted, round_rate(rate)))
    }

    async fn base_rate(&self, code: CurrencyCode) -> Result<Decimal, RepoError> {
        if code == self.base {
            Ok(Decimal::ONE)
        } else {
            self.rate_of(code).await
        }
    }

    /// Looks up a usable rate for `code`.
    async fn rate_of(&self, code: CurrencyCode) -> Result<Decimal, RepoError> {
        let record = self
            .repo
            .get(code)
            .await?
            .ok_or(DomainError::CurrencyNotFound(code))?;

        if record.rate_to_base <= Decimal::ZERO {
            return Err(DomainError::InvalidRateState {
                code,
                rate: record.rate_to_base,
            }
            .into());
        }

        Ok(record.rate_to_base)
    }
}
