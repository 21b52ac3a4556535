// =====================================================
// 지갑 HTTP API 통합 테스트
// =====================================================
// 라우터를 직접 호출(oneshot)해서 상태 코드와 JSON 형태를 확인한다.
// =====================================================

mod common;
use common::*;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// 테스트: 생성 → 입금 → 잔액 조회 (캐시 miss 후 hit)
#[tokio::test]
async fn test_create_deposit_and_read_balance() {
    let stack = setup_test();
    let router = stack.router();

    let (status, body) = send(&router, "POST", "/api/wallets/player-7", Some(json!({ "currency": "KRW" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["wallet"]["balance"], "0");
    assert_eq!(body["wallet"]["version"], 0);

    let (status, body) = send(
        &router,
        "POST",
        "/api/wallets/player-7/transactions",
        Some(json!({ "amount": "150.25", "transaction_type": "deposit", "reference_id": "dep-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], "150.25");
    assert_eq!(body["transaction_type"], "deposit");

    let (status, body) = send(&router, "GET", "/api/wallets/player-7/balance", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], "150.25");
    assert_eq!(body["cache_hit"], false);

    let (_, body) = send(&router, "GET", "/api/wallets/player-7/balance", None).await;
    assert_eq!(body["cache_hit"], true);
}

#[tokio::test]
async fn test_duplicate_wallet_is_conflict() {
    let stack = setup_test();
    let router = stack.router();

    send(&router, "POST", "/api/wallets/player-7", Some(json!({ "currency": "KRW" }))).await;
    let (status, body) = send(&router, "POST", "/api/wallets/player-7", Some(json!({ "currency": "KRW" }))).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_error_statuses() {
    let stack = setup_test();
    stack.repo.seed_wallet(TEST_OWNER_ID, TEST_CURRENCY, dec!(10), 0);
    let router = stack.router();
    let uri = format!("/api/wallets/{}/transactions", TEST_OWNER_ID);

    let (status, _) = send(&router, "GET", "/api/wallets/nobody/balance", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, "POST", &uri, Some(json!({ "amount": "0", "transaction_type": "deposit" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&router, "POST", &uri, Some(json!({ "amount": "11", "transaction_type": "bet" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Insufficient funds"));

    let (status, _) = send(
        &router,
        "POST",
        &uri,
        Some(json!({ "amount": "1", "transaction_type": "deposit", "currency": "USD" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, "POST", "/api/wallets/player-9", Some(json!({ "currency": "won" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 컬럼보다 정밀한 금액
    let (status, body) = send(
        &router,
        "POST",
        &uri,
        Some(json!({ "amount": "0.00001", "transaction_type": "deposit" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["retryable"], false);
}

/// 테스트: 같은 reference_id 재전송은 같은 결과
#[tokio::test]
async fn test_replayed_request_returns_same_body() {
    let stack = setup_test();
    stack.repo.seed_wallet(TEST_OWNER_ID, TEST_CURRENCY, dec!(0), 0);
    let router = stack.router();
    let uri = format!("/api/wallets/{}/transactions", TEST_OWNER_ID);
    let request = json!({ "amount": "100", "transaction_type": "deposit", "reference_id": "tx-42" });

    let (_, first) = send(&router, "POST", &uri, Some(request.clone())).await;
    let (status, second) = send(&router, "POST", &uri, Some(request)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);

    let (status, found) = send(
        &router,
        "GET",
        &format!("/api/wallets/{}/transactions/reference/tx-42", TEST_OWNER_ID),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["id"], first["transaction_id"]);
    assert_eq!(found["status"], "completed");

    let (status, _) = send(
        &router,
        "GET",
        &format!("/api/wallets/{}/transactions/reference/tx-404", TEST_OWNER_ID),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_paging() {
    let stack = setup_test();
    stack.repo.seed_wallet(TEST_OWNER_ID, TEST_CURRENCY, dec!(0), 0);
    let router = stack.router();
    let uri = format!("/api/wallets/{}/transactions", TEST_OWNER_ID);

    for amount in ["1", "2", "3"] {
        send(&router, "POST", &uri, Some(json!({ "amount": amount, "transaction_type": "bonus" }))).await;
    }

    let (status, body) = send(&router, "GET", &format!("{}?limit=2&offset=1", uri), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["limit"], 2);
    let amounts: Vec<_> = body["transactions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["amount"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(amounts, vec!["2", "1"]);
}

/// 테스트: 베팅 취소 후 재전송, 취소 불가/원본 없음 상태 코드
#[tokio::test]
async fn test_cancel_endpoint() {
    let stack = setup_test();
    stack.repo.seed_wallet(TEST_OWNER_ID, TEST_CURRENCY, dec!(100), 0);
    let router = stack.router();
    let uri = format!("/api/wallets/{}/transactions", TEST_OWNER_ID);
    let cancel_uri = format!("{}/cancel", uri);

    let (_, bet) = send(
        &router,
        "POST",
        &uri,
        Some(json!({ "amount": "40", "transaction_type": "bet", "reference_id": "bet-1" })),
    )
    .await;

    let request = json!({ "reference_id": "cancel-1", "original_reference_id": "bet-1" });
    let (status, first) = send(&router, "POST", &cancel_uri, Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["balance"], "100");
    assert_eq!(first["transaction_type"], "cancel");
    assert_eq!(first["ref_transaction_id"], bet["transaction_id"]);

    let (status, second) = send(&router, "POST", &cancel_uri, Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);

    let (_, original) = send(&router, "GET", &format!("{}/reference/bet-1", uri), None).await;
    assert_eq!(original["status"], "cancelled");

    let (status, _) = send(
        &router,
        "POST",
        &cancel_uri,
        Some(json!({ "reference_id": "cancel-2", "original_reference_id": "cancel-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &router,
        "POST",
        &cancel_uri,
        Some(json!({ "reference_id": "cancel-3", "original_reference_id": "bet-404" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
