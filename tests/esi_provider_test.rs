//! Integration tests for the ESI provider against a mock HTTP server
//!
//! No real network access: every endpoint is served by wiremock, so the
//! error taxonomy and record filtering can be asserted deterministically.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{jita, JITA_STATION, TRITANIUM};
use tradehub_analyzer::common::channels::create_event_channel;
use tradehub_analyzer::config::EsiConfig;
use tradehub_analyzer::{
    AppConfig, ChannelSink, CoreError, DataProvider, EsiProvider, Scheduler, Side,
};

const CHARACTER_ID: u64 = 93000001;

fn provider_for(server: &MockServer) -> EsiProvider {
    let config = EsiConfig {
        base_url: server.uri(),
        character_id: Some(CHARACTER_ID),
        access_token: Some("test-token".into()),
        user_agent: "tradehub_analyzer/tests".into(),
    };
    EsiProvider::new(&config).unwrap()
}

fn market_order(order_id: u64, location_id: u64, is_buy_order: bool, price: f64) -> serde_json::Value {
    json!({
        "duration": 90,
        "is_buy_order": is_buy_order,
        "issued": "2026-08-01T12:00:00Z",
        "location_id": location_id,
        "min_volume": 1,
        "order_id": order_id,
        "price": price,
        "range": "region",
        "system_id": 30000142,
        "type_id": TRITANIUM,
        "volume_remain": 100,
        "volume_total": 200
    })
}

#[test_log::test(tokio::test)]
async fn market_quotes_keep_station_orders_and_flip_sides() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/markets/10000002/orders/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            market_order(1, JITA_STATION, false, 1000000.0), // ask at the hub
            market_order(2, JITA_STATION, true, 950000.0),   // bid at the hub
            market_order(3, 60000004, false, 900000.0),      // elsewhere in region
            market_order(4, JITA_STATION, false, 0.0),       // malformed, dropped
        ])))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let quotes = provider.fetch_market_quotes(&[jita()]).await.unwrap();

    assert_eq!(quotes.len(), 2);
    let ask = quotes.iter().find(|q| q.order_id == 1).unwrap();
    assert_eq!(ask.side, Side::Buy, "an ask is a price we can buy at");
    let bid = quotes.iter().find(|q| q.order_id == 2).unwrap();
    assert_eq!(bid.side, Side::Sell, "a bid is a price we can sell into");
}

#[test_log::test(tokio::test)]
async fn paged_endpoints_follow_the_pages_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/markets/10000002/orders/"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-pages", "2")
                .set_body_json(json!([market_order(1, JITA_STATION, false, 1000000.0)])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/markets/10000002/orders/"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-pages", "2")
                .set_body_json(json!([market_order(2, JITA_STATION, true, 950000.0)])),
        )
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let quotes = provider.fetch_market_quotes(&[jita()]).await.unwrap();
    assert_eq!(quotes.len(), 2);
}

#[test_log::test(tokio::test)]
async fn unauthorized_maps_to_provider_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/characters/{CHARACTER_ID}/wallet/")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider.fetch_wallet_balance().await.unwrap_err();
    assert!(matches!(err, CoreError::ProviderAuth(_)), "got {err:?}");
}

#[test_log::test(tokio::test)]
async fn upstream_5xx_maps_to_provider_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/characters/{CHARACTER_ID}/wallet/")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider.fetch_wallet_balance().await.unwrap_err();
    assert!(
        matches!(err, CoreError::ProviderUnavailable(_)),
        "got {err:?}"
    );
}

#[test_log::test(tokio::test)]
async fn wallet_balance_parses_the_plain_number_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/characters/{CHARACTER_ID}/wallet/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(2456789007.50)))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let balance = provider.fetch_wallet_balance().await.unwrap();
    assert_eq!(balance, dec!(2456789007.50));
}

#[test_log::test(tokio::test)]
async fn wallet_transactions_respect_the_since_cutoff() {
    let now = Utc::now();
    let recent = now - ChronoDuration::days(2);
    let ancient = now - ChronoDuration::days(90);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/characters/{CHARACTER_ID}/wallet/transactions/"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "transaction_id": 1,
                "type_id": TRITANIUM,
                "location_id": JITA_STATION,
                "is_buy": true,
                "unit_price": 900000.0,
                "quantity": 10,
                "date": recent.to_rfc3339(),
                "journal_ref_id": 11
            },
            {
                "transaction_id": 2,
                "type_id": TRITANIUM,
                "location_id": JITA_STATION,
                "is_buy": true,
                "unit_price": 800000.0,
                "quantity": 5,
                "date": ancient.to_rfc3339(),
                "journal_ref_id": 12
            }
        ])))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let since = now - ChronoDuration::days(30);
    let transactions = provider.fetch_wallet_transactions(since).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].unit_price, dec!(900000));
    assert_eq!(transactions[0].side, Side::Buy);
}

#[test_log::test(tokio::test)]
async fn contract_summary_counts_open_contracts_and_collateral() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/characters/{CHARACTER_ID}/contracts/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "contract_id": 1, "status": "outstanding", "type": "courier", "collateral": 50000000.0 },
            { "contract_id": 2, "status": "in_progress", "type": "courier", "collateral": 100000000.0 },
            { "contract_id": 3, "status": "finished", "type": "courier", "collateral": 900000000.0 },
            { "contract_id": 4, "status": "outstanding", "type": "item_exchange" }
        ])))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let summary = provider.fetch_contract_summary().await.unwrap();
    assert_eq!(summary.open_count, 3);
    assert_eq!(summary.total_collateral, dec!(150000000));
}

#[test_log::test(tokio::test)]
async fn slow_upstream_times_out_as_a_failed_fetch() {
    let server = MockServer::start().await;
    // Everything 404s except the market endpoint, which stalls past the
    // scheduler's fetch timeout.
    Mock::given(method("GET"))
        .and(path("/markets/10000002/orders/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!([])),
        )
        .mount(&server)
        .await;

    let mut config = AppConfig::default();
    config.hubs = vec![jita()];
    config.fetch_timeout_secs = 1;
    config.esi = EsiConfig {
        base_url: server.uri(),
        character_id: Some(CHARACTER_ID),
        access_token: None,
        user_agent: "tradehub_analyzer/tests".into(),
    };

    let provider = Arc::new(EsiProvider::new(&config.esi).unwrap());
    let (tx, _rx) = create_event_channel();
    let (mut scheduler, _handle) =
        Scheduler::new(provider, Arc::new(ChannelSink::new(tx)), config);

    let report = scheduler.tick().await;
    assert!(report
        .failed_fetches
        .contains(&"market_quotes".to_string()));
    // No baseline was poisoned by the stall.
    assert_eq!(report.alerts, 0);
}
