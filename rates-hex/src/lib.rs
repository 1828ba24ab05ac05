//! # Rates Hex
//!
//! Application core and HTTP adapter for the currency rate service.
//!
//! ## Architecture
//!
//! - `repository` - Cache-aside facade over the store and cache ports
//! - `conversion` - Two-hop conversion through the base currency
//! - `scheduler` - Self-rescheduling background refresh from the feed port
//! - `service` - Application service (orchestrates the above)
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! Adapters are injected as `Arc<dyn Port>` trait objects, so the store,
//! cache and feed can be swapped at runtime wiring.

pub mod conversion;
pub mod inbound;
pub mod openapi;
pub mod repository;
pub mod scheduler;
pub mod service;

#[cfg(test)]
mod mocks;

#[cfg(test)]
mod conversion_tests;

pub use conversion::ConversionEngine;
pub use repository::{CACHE_KEY_PREFIX, DEFAULT_CACHE_TTL, RateRepository, cache_key};
pub use scheduler::{RateRefreshScheduler, SchedulerConfig, SchedulerStatus};
pub use service::RateService;
