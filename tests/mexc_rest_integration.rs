//! Integration tests for the MEXC REST client against a mock server
//!
//! Every endpoint the trading core uses is exercised hermetically with
//! wiremock; no real exchange is contacted.

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mexc_spot_trader::common::errors::TraderError;
use mexc_spot_trader::common::types::{
    OrderRequest, OrderStatus, OrderType, Side, TimeInForce,
};
use mexc_spot_trader::config::types::ApiCredentials;
use mexc_spot_trader::mexc::rest::MexcRestClient;

fn credentials() -> ApiCredentials {
    ApiCredentials::new("test_key".to_string(), "test_secret".to_string())
}

fn signed_client(server: &MockServer) -> MexcRestClient {
    MexcRestClient::new(&server.uri())
        .unwrap()
        .with_credentials(credentials())
}

fn buy_request(is_test: bool) -> OrderRequest {
    OrderRequest {
        symbol: "SOLUSDT".to_string(),
        side: Side::Buy,
        order_type: OrderType::Limit,
        qty: dec!(2.5),
        price: dec!(2.00),
        time_in_force: TimeInForce::GoodTilCancelled,
        is_test,
        client_order_id: "buy-SOLUSDT-1700000000000".to_string(),
    }
}

#[tokio::test]
async fn test_exchange_info_parses_symbols_and_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/exchangeInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "timezone": "UTC",
            "symbols": [
                {
                    "symbol": "SOLUSDT",
                    "status": "1",
                    "isSpotTradingAllowed": true,
                    "baseAsset": "SOL",
                    "quoteAsset": "USDT",
                    "baseAssetPrecision": 2,
                    "quotePrecision": 2,
                    "filters": [
                        {"filterType": "PRICE_FILTER", "tickSize": "0.01"},
                        {"filterType": "LOT_SIZE", "stepSize": "0.01", "minQty": "0.01"}
                    ]
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = MexcRestClient::new(&server.uri()).unwrap();
    let info = client.get_exchange_info(None).await.unwrap();

    assert_eq!(info.symbols.len(), 1);
    let sol = info.symbol("SOLUSDT").unwrap();
    assert!(sol.is_online());
    assert_eq!(sol.base_asset, "SOL");
    assert_eq!(
        sol.filters.as_ref().unwrap()[0].tick_size,
        Some(dec!(0.01))
    );
}

#[tokio::test]
async fn test_candles_parse_positional_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/klines"))
        .and(query_param("symbol", "SOLUSDT"))
        .and(query_param("interval", "60m"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            [1700000000000_i64, "2.00", "2.10", "1.95", "2.05", "1000", 1700003599999_i64, "2050"],
            [1700003600000_i64, "2.05", "2.15", "2.00", "2.10", "900", 1700007199999_i64, "1890"]
        ])))
        .mount(&server)
        .await;

    let client = MexcRestClient::new(&server.uri()).unwrap();
    // the 1h alias maps onto the exchange's 60m spelling
    let candles = client.get_candles("SOLUSDT", "1h", 2).await.unwrap();

    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].close, dec!(2.05));
    assert_eq!(candles[1].close, dec!(2.10));
    assert!(candles[0].open_time < candles[1].open_time);
}

#[tokio::test]
async fn test_invalid_interval_fails_before_any_request() {
    let client = MexcRestClient::new("http://127.0.0.1:1").unwrap();
    let result = client.get_candles("SOLUSDT", "7m", 2).await;
    assert!(matches!(result, Err(TraderError::Configuration(_))));
}

#[tokio::test]
async fn test_place_test_order_signs_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/order/test"))
        .and(header("X-MEXC-APIKEY", "test_key"))
        .and(body_string_contains("symbol=SOLUSDT"))
        .and(body_string_contains("side=BUY"))
        .and(body_string_contains("newClientOrderId=buy-SOLUSDT-1700000000000"))
        .and(body_string_contains("recvWindow="))
        .and(body_string_contains("&signature="))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let client = signed_client(&server);
    let ack = client.post_order(&buy_request(true)).await.unwrap();

    // the test endpoint returns an empty body
    assert!(ack.order_id.is_none());
    assert!(ack.status.is_none());
}

#[tokio::test]
async fn test_place_order_returns_exchange_ack() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/order"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "orderId": 123456,
            "status": "NEW"
        })))
        .mount(&server)
        .await;

    let client = signed_client(&server);
    let ack = client.post_order(&buy_request(false)).await.unwrap();

    assert_eq!(ack.order_id.as_deref(), Some("123456"));
    assert_eq!(ack.status, Some(OrderStatus::New));
}

#[tokio::test]
async fn test_rejected_order_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/order"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string(r#"{"code":30005,"msg":"Oversold"}"#),
        )
        .mount(&server)
        .await;

    let client = signed_client(&server);
    let result = client.post_order(&buy_request(false)).await;

    match result {
        Err(TraderError::Exchange { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("Oversold"));
        }
        other => panic!("expected exchange error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_order_status_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/order"))
        .and(query_param("symbol", "SOLUSDT"))
        .and(query_param("orderId", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "orderId": 42,
            "status": "FILLED",
            "executedQty": "1.2345",
            "cummulativeQuoteQty": "123.45"
        })))
        .mount(&server)
        .await;

    let client = signed_client(&server);
    let report = client.get_order_status("SOLUSDT", "42").await.unwrap();

    assert_eq!(report.status, OrderStatus::Filled);
    assert_eq!(report.executed_qty, Some(dec!(1.2345)));
    assert_eq!(report.cumulative_quote_qty, Some(dec!(123.45)));
}

#[tokio::test]
async fn test_account_balances() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/account"))
        .and(header("X-MEXC-APIKEY", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "balances": [
                {"asset": "USDT", "free": "1000.50", "locked": "0"},
                {"asset": "SOL", "free": "2.5", "locked": "0.5"}
            ]
        })))
        .mount(&server)
        .await;

    let client = signed_client(&server);
    let balances = client.get_account_balances().await.unwrap();

    assert_eq!(balances.len(), 2);
    assert_eq!(balances[0].asset, "USDT");
    assert_eq!(balances[0].free, dec!(1000.50));
    assert_eq!(balances[1].free, dec!(2.5));
}

#[tokio::test]
async fn test_list_spot_symbols_filters_offline_and_foreign_quotes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/exchangeInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "symbols": [
                {"symbol": "SOLUSDT", "status": "1", "isSpotTradingAllowed": true,
                 "baseAsset": "SOL", "quoteAsset": "USDT"},
                {"symbol": "DEADUSDT", "status": "3", "isSpotTradingAllowed": true,
                 "baseAsset": "DEAD", "quoteAsset": "USDT"},
                {"symbol": "SOLBTC", "status": "1", "isSpotTradingAllowed": true,
                 "baseAsset": "SOL", "quoteAsset": "BTC"},
                {"symbol": "BTCUSDT", "status": "1", "isSpotTradingAllowed": true,
                 "baseAsset": "BTC", "quoteAsset": "USDT"}
            ]
        })))
        .mount(&server)
        .await;

    let client = MexcRestClient::new(&server.uri()).unwrap();
    let symbols = client.list_spot_symbols("USDT").await.unwrap();

    assert_eq!(symbols, vec!["BTCUSDT".to_string(), "SOLUSDT".to_string()]);
}

#[tokio::test]
async fn test_server_time() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/time"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"serverTime": 1700000000000_i64})),
        )
        .mount(&server)
        .await;

    let client = MexcRestClient::new(&server.uri()).unwrap();
    let time = client.server_time().await.unwrap();
    assert_eq!(time, 1_700_000_000_000);
}
