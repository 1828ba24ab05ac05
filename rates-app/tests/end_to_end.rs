//! Full-stack test: fake upstream feed, real adapters, HTTP API driven
//! through the client SDK.

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, extract::State, routing::get};
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

use rates_client::RatesClient;
use rates_feed::{ExchangeRateApiClient, FeedConfig};
use rates_hex::{
    ConversionEngine, RateRefreshScheduler, RateRepository, RateService, SchedulerConfig,
    inbound::HttpServer,
};
use rates_repo::{MemoryCache, memory::MemoryRateStore};
use rates_types::{CurrencyCode, RateRecord, RefreshOutcome, SchedulerPhase};

type Upstream = Arc<Mutex<Value>>;

fn usd_payload(twd_per_usd: f64) -> Value {
    json!({
        "base": "USD",
        "date": "2024-01-01",
        "rates": { "USD": 1, "TWD": twd_per_usd, "EUR": 0.92, "JPY": 150, "CNY": 7.2 }
    })
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{}", addr)
}

async fn start_upstream(payload: Upstream) -> String {
    let app = Router::new()
        .route(
            "/v4/latest/USD",
            get(|State(payload): State<Upstream>| async move { Json(payload.lock().clone()) }),
        )
        .with_state(payload);
    serve(app).await
}

struct Stack {
    client: RatesClient,
    scheduler: RateRefreshScheduler,
    upstream: Upstream,
}

async fn start_stack() -> Stack {
    let upstream: Upstream = Arc::new(Mutex::new(usd_payload(32.0)));
    let upstream_url = start_upstream(upstream.clone()).await;

    let repo = RateRepository::new(
        Arc::new(MemoryRateStore::new()),
        Arc::new(MemoryCache::<RateRecord>::new()),
    );
    let feed = ExchangeRateApiClient::new(
        FeedConfig::new(CurrencyCode::TWD).with_url(format!("{}/v4/latest/USD", upstream_url)),
    )
    .unwrap();
    let config = SchedulerConfig {
        auto_update: false,
        ..SchedulerConfig::default()
    };
    let scheduler = RateRefreshScheduler::new(config, repo.clone(), Arc::new(feed)).unwrap();
    scheduler.start().unwrap();

    let engine = ConversionEngine::new(repo.clone(), CurrencyCode::TWD);
    let service = RateService::new(repo, engine, scheduler.clone());
    let api_url = serve(HttpServer::new(service).router()).await;

    Stack {
        client: RatesClient::new(api_url),
        scheduler,
        upstream,
    }
}

async fn wait_for<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not reached within 5s");
}

#[tokio::test]
async fn test_startup_refresh_populates_the_rate_table() {
    let stack = start_stack().await;
    let client = &stack.client;

    wait_for(|| async move { client.list_currencies().await.unwrap().len() == 5 }).await;

    let rates = client.list_currencies().await.unwrap();
    let rate = |code| {
        rates
            .iter()
            .find(|r| r.code == code)
            .map(|r| r.rate_to_base)
            .unwrap()
    };
    assert_eq!(rate(CurrencyCode::TWD), dec!(1));
    assert_eq!(rate(CurrencyCode::USD), dec!(32));
    assert_eq!(rate(CurrencyCode::EUR), dec!(34.782609));
    assert_eq!(rate(CurrencyCode::JPY), dec!(0.213333));
    assert_eq!(rate(CurrencyCode::CNY), dec!(4.444444));

    let status = client.auto_update_status().await.unwrap();
    assert!(!status.enabled);
    assert_eq!(status.phase, SchedulerPhase::Disabled);
    let report = status.last_report.unwrap();
    assert_eq!(report.outcome, RefreshOutcome::Completed);
    assert_eq!(report.created, 5);

    stack.scheduler.shutdown().await;
}

#[tokio::test]
async fn test_manual_refresh_picks_up_new_upstream_rates() {
    let stack = start_stack().await;
    let client = &stack.client;

    wait_for(|| async move { client.get_currency(CurrencyCode::USD).await.is_ok() }).await;

    // Warm the cache so the refresh has to replace the cached entry too
    let before = client.get_currency(CurrencyCode::USD).await.unwrap();
    assert_eq!(before.rate_to_base, dec!(32));

    *stack.upstream.lock() = usd_payload(31.25);
    client.refresh().await.unwrap();

    wait_for(|| async move {
        client.get_currency(CurrencyCode::USD).await.unwrap().rate_to_base == dec!(31.25)
    })
    .await;

    let converted = client
        .convert(dec!(1000), CurrencyCode::USD, CurrencyCode::TWD)
        .await
        .unwrap();
    assert_eq!(converted.converted, dec!(31250.00));

    stack.scheduler.shutdown().await;
}

#[tokio::test]
async fn test_admin_edits_round_trip_through_the_client() {
    let stack = start_stack().await;
    let client = &stack.client;

    wait_for(|| async move { client.list_currencies().await.unwrap().len() == 5 }).await;

    let saved = client
        .set_rate(CurrencyCode::JPY, dec!(0.2123456789))
        .await
        .unwrap();
    assert_eq!(saved.rate_to_base, dec!(0.212346));

    client.delete_currency(CurrencyCode::CNY).await.unwrap();
    let err = client.get_currency(CurrencyCode::CNY).await.unwrap_err();
    assert!(err.is_not_found());

    let evicted = client.evict(None).await.unwrap();
    assert!(evicted.evicted >= 1);

    let status = client.enable_auto_update().await.unwrap();
    assert!(status.enabled);
    let status = client.disable_auto_update().await.unwrap();
    assert!(!status.enabled);

    stack.scheduler.shutdown().await;
}
