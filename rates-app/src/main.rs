//! # Rates Application
//!
//! Binary that wires together all the components:
//! - Load configuration from environment
//! - Initialize the store, cache and upstream feed adapters
//! - Start the refresh scheduler
//! - Start the HTTP server

mod config;

use std::sync::Arc;

use opentelemetry::global;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rates_feed::ExchangeRateApiClient;
use rates_hex::{
    ConversionEngine, RateRefreshScheduler, RateRepository, RateService, inbound::HttpServer,
};
use rates_repo::{MemoryCache, build_store};
use rates_types::RateRecord;

fn init_tracer() -> anyhow::Result<(sdktrace::Tracer, sdktrace::SdkTracerProvider)> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    // Endpoint comes from OTEL_EXPORTER_OTLP_ENDPOINT
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()?;

    let provider = sdktrace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .build();

    global::set_tracer_provider(provider.clone());

    use opentelemetry::trace::TracerProvider as _;
    Ok((provider.tracer("rates-service"), provider))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize OpenTelemetry tracing when a collector is configured
    let (telemetry, otel_provider) = match config.otel_endpoint {
        Some(_) => {
            let (tracer, provider) = init_tracer()?;
            (
                Some(tracing_opentelemetry::layer().with_tracer(tracer)),
                Some(provider),
            )
        }
        None => (None, None),
    };

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rates_app=debug,rates_hex=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry)
        .init();

    tracing::info!("Starting rates server on port {}", config.port);
    tracing::info!(
        base = %config.base_currency,
        base_name = config.base_currency.display_name(),
        base_symbol = config.base_currency.symbol(),
        feed = %config.feed_url,
        "Using database: {}",
        config.database_url
    );

    // Build store (handles connection and migration)
    let store = build_store(&config.database_url).await?;
    tracing::info!(backend = store.backend(), "Rate store ready");

    let cache = Arc::new(MemoryCache::<RateRecord>::new());
    let repo = RateRepository::with_ttl(Arc::new(store), cache, config.cache_ttl);

    // Upstream feed and refresh scheduler
    let feed = ExchangeRateApiClient::new(config.feed_config())?;
    let scheduler =
        RateRefreshScheduler::new(config.scheduler_config(), repo.clone(), Arc::new(feed))?;
    scheduler.start()?;

    // Create the rate service
    let engine = ConversionEngine::new(repo.clone(), config.base_currency);
    let service = RateService::new(repo, engine, scheduler.clone());

    // Create and run the HTTP server
    let server = HttpServer::new(service);
    let addr = format!("0.0.0.0:{}", config.port);

    let served = server.run(&addr).await;

    // Let an in-flight refresh finish before exiting
    scheduler.shutdown().await;

    // Ensure traces are flushed before exit
    if let Some(provider) = otel_provider {
        let _ = provider.shutdown();
    }

    served
}
