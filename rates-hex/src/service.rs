//! Rate Application Service
//!
//! Orchestrates the repository, conversion engine and refresh scheduler
//! for the inbound adapters. Contains NO infrastructure logic.

use rust_decimal::Decimal;

use rates_types::{
    AppError, AutoUpdateStatus, ConvertRequest, ConvertResponse, CurrencyCode, RateRecord,
    SetRateRequest,
};

use crate::conversion::ConversionEngine;
use crate::repository::RateRepository;
use crate::scheduler::RateRefreshScheduler;

/// Application service for rate operations.
#[derive(Clone)]
pub struct RateService {
    repo: RateRepository,
    engine: ConversionEngine,
    scheduler: RateRefreshScheduler,
}

impl RateService {
    pub fn new(
        repo: RateRepository,
        engine: ConversionEngine,
        scheduler: RateRefreshScheduler,
    ) -> Self {
        Self {
            repo,
            engine,
            scheduler,
        }
    }

    pub fn repo(&self) -> &RateRepository {
        &self.repo
    }

    pub fn scheduler(&self) -> &RateRefreshScheduler {
        &self.scheduler
    }

    pub fn base_currency(&self) -> CurrencyCode {
        self.engine.base()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Rate Records
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lists every stored rate.
    pub async fn list_rates(&self) -> Result<Vec<RateRecord>, AppError> {
        self.repo.list().await.map_err(Into::into)
    }

    /// Gets the rate for one currency.
    pub async fn get_rate(&self, code: CurrencyCode) -> Result<RateRecord, AppError> {
        self.repo
            .get(code)
            .await
            .map_err(Into::into)
            .and_then(|opt| opt.ok_or_else(|| AppError::NotFound(format!("Currency {}", code))))
    }

    /// Creates or overwrites the rate for one currency.
    #[tracing::instrument(skip(self, req), fields(code = %code, rate = %req.rate_to_base))]
    pub async fn set_rate(
        &self,
        code: CurrencyCode,
        req: SetRateRequest,
    ) -> Result<RateRecord, AppError> {
        if code == self.base_currency() && req.rate_to_base != Decimal::ONE {
            return Err(AppError::BadRequest(format!(
                "Base currency {} must have a rate of 1",
                code
            )));
        }

        let record = RateRecord::new(code, req.rate_to_base)?;
        self.repo.put(record).await.map_err(Into::into)
    }

    /// Deletes the rate for one currency.
    #[tracing::instrument(skip(self))]
    pub async fn delete_rate(&self, code: CurrencyCode) -> Result<(), AppError> {
        if self.repo.delete(code).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Currency {}", code)))
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Conversion
    // ─────────────────────────────────────────────────────────────────────────────

    /// Converts an amount and reports the effective rate used.
    pub async fn convert(&self, req: ConvertRequest) -> Result<ConvertResponse, AppError> {
        if req.amount < Decimal::ZERO {
            return Err(AppError::BadRequest("Amount must not be negative".into()));
        }

        let (converted, rate) = self
            .engine
            .convert_with_quote(req.amount, req.from, req.to)
            .await?;

        Ok(ConvertResponse {
            amount: req.amount,
            from: req.from,
            to: req.to,
            converted,
            rate,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Cache
    // ─────────────────────────────────────────────────────────────────────────────

    /// Evicts one cached rate. Returns how many entries were removed.
    pub async fn evict(&self, code: CurrencyCode) -> Result<usize, AppError> {
        let evicted = self.repo.evict(code).await?;
        Ok(usize::from(evicted))
    }

    /// Evicts every cached rate.
    pub async fn evict_all(&self) -> Result<usize, AppError> {
        self.repo.evict_all().await.map_err(Into::into)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Refresh
    // ─────────────────────────────────────────────────────────────────────────────

    /// Queues a manual refresh.
    pub fn trigger_refresh(&self) -> Result<(), AppError> {
        self.scheduler.trigger_refresh_now().map_err(Into::into)
    }

    pub fn auto_update_status(&self) -> AutoUpdateStatus {
        self.scheduler.status().into()
    }

    pub fn enable_auto_update(&self) -> Result<AutoUpdateStatus, AppError> {
        self.scheduler.enable_auto_update()?;
        Ok(self.auto_update_status())
    }

    pub fn disable_auto_update(&self) -> AutoUpdateStatus {
        self.scheduler.disable_auto_update();
        self.auto_update_status()
    }
}
