//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod cache;
mod feed;
mod store;

pub use cache::KeyValueCache;
pub use feed::{RateFeed, RateQuotes};
pub use store::RateStore;
