//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

pub mod handlers;
mod server;

pub use server::{HttpServer, shutdown_signal};
