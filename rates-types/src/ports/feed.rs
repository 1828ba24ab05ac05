//! Upstream rate feed port.
//!
//! Implementations can be HTTP clients, scripted test feeds, etc.

use std::collections::HashMap;

use rust_decimal::Decimal;

/// Latest quotes keyed by currency code, already expressed as rate-to-base.
pub type RateQuotes = HashMap<String, Decimal>;

/// Port trait for the external quote source.
#[async_trait::async_trait]
pub trait RateFeed: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Fetches a snapshot of rate-to-base quotes.
    ///
    /// Never fails: any upstream problem yields an empty map, which callers
    /// must read as "no update available".
    async fn fetch_latest_rates(&self) -> RateQuotes;
}
