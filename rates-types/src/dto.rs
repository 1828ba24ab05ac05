//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::CurrencyCode;

// ─────────────────────────────────────────────────────────────────────────────
// Rate DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create or overwrite a currency's rate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetRateRequest {
    /// Units of base currency per one unit of the currency
    #[schema(value_type = String, example = "31.25")]
    pub rate_to_base: Decimal,
}

/// Request to convert an amount between two currencies.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConvertRequest {
    #[schema(value_type = String, example = "1000.00")]
    pub amount: Decimal,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

/// Result of a conversion.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConvertResponse {
    #[schema(value_type = String, example = "1000.00")]
    pub amount: Decimal,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    /// Converted amount, rounded half-up to 2 decimal places
    #[schema(value_type = String, example = "31250.00")]
    pub converted: Decimal,
    /// Effective `from` -> `to` rate (6 decimal places)
    #[schema(value_type = String, example = "31.250000")]
    pub rate: Decimal,
}

/// Number of cache entries removed by an eviction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EvictResponse {
    #[schema(example = 5)]
    pub evicted: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Refresh DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// What started a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    Startup,
    Scheduled,
    Manual,
}

/// How a refresh cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// Quotes were fetched and reconciled (possibly partially).
    Completed,
    /// The feed returned no usable data; nothing was reconciled.
    NoData,
    /// The cycle aborted unexpectedly.
    Failed,
}

/// Summary of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RefreshReport {
    pub run_id: Uuid,
    pub trigger: RefreshTrigger,
    pub outcome: RefreshOutcome,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Lifecycle phase of the refresh scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPhase {
    Disabled,
    Armed,
    Running,
}

/// Snapshot of the refresh scheduler for the admin API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AutoUpdateStatus {
    pub enabled: bool,
    pub phase: SchedulerPhase,
    pub next_run_at: Option<DateTime<Utc>>,
    /// Refresh cycles currently executing
    pub in_flight: usize,
    pub last_report: Option<RefreshReport>,
}

/// Acknowledgement of a queued manual refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RefreshAccepted {
    #[schema(example = "queued")]
    pub status: String,
    pub message: String,
}
