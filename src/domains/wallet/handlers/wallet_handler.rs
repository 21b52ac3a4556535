use crate::domains::wallet::models::{
    CancelRequest, CreateWalletRequest, CreateWalletResponse, HistoryQuery, MutationRequest, Transaction,
    TransactionHistory, TransactionOutcome, WalletBalanceResponse,
};
use crate::shared::services::AppState;
use crate::shared::errors::WalletError;
use axum::{extract::{Path, Query, State}, http::StatusCode, Json};

// 인증은 앞단(게이트웨이)에서 끝난 상태로 들어온다.
// 경로의 owner_id는 이미 확인된 호출자 ID로 취급한다.

type ApiError = (StatusCode, Json<serde_json::Value>);

/// 지갑 생성 핸들러
/// Create wallet handler
#[utoipa::path(
    post,
    path = "/api/wallets/{owner_id}",
    params(
        ("owner_id" = String, Path, description = "Owner account ID")
    ),
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created successfully", body = CreateWalletResponse),
        (status = 400, description = "Invalid currency code"),
        (status = 409, description = "Wallet already exists for owner"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Wallets"
)]
pub async fn create_wallet(
    State(app_state): State<AppState>,
    Path(owner_id): Path<String>,
    Json(request): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<CreateWalletResponse>), ApiError> {
    let wallet = app_state
        .wallet_state
        .wallet_service
        .create_wallet(&owner_id, &request.currency)
        .await
        .map_err(|e: WalletError| -> ApiError { e.into() })?;

    Ok((
        StatusCode::CREATED,
        Json(CreateWalletResponse {
            wallet,
            message: "Wallet created successfully".to_string(),
        }),
    ))
}

/// 잔액 조회 핸들러
/// Get balance handler (served from cache when possible)
#[utoipa::path(
    get,
    path = "/api/wallets/{owner_id}/balance",
    params(
        ("owner_id" = String, Path, description = "Owner account ID")
    ),
    responses(
        (status = 200, description = "Current balance", body = WalletBalanceResponse),
        (status = 404, description = "Wallet not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Wallets"
)]
pub async fn get_balance(
    State(app_state): State<AppState>,
    Path(owner_id): Path<String>,
) -> Result<Json<WalletBalanceResponse>, ApiError> {
    let (snapshot, cache_hit) = app_state
        .wallet_state
        .wallet_service
        .get_balance(&owner_id)
        .await
        .map_err(|e: WalletError| -> ApiError { e.into() })?;

    Ok(Json(WalletBalanceResponse::new(snapshot, cache_hit)))
}

/// 잔액 변경 핸들러 (입금/출금/베팅/당첨/보너스/환불)
/// Apply a credit or debit
///
/// 같은 reference_id로 다시 보내면 처음 결과를 그대로 돌려준다.
#[utoipa::path(
    post,
    path = "/api/wallets/{owner_id}/transactions",
    params(
        ("owner_id" = String, Path, description = "Owner account ID")
    ),
    request_body = MutationRequest,
    responses(
        (status = 200, description = "Mutation applied (or previously applied)", body = TransactionOutcome),
        (status = 400, description = "Invalid amount, currency mismatch or insufficient funds"),
        (status = 404, description = "Wallet not found"),
        (status = 503, description = "Wallet busy, retry later"),
        (status = 504, description = "Store timed out, outcome unknown; retry with the same reference_id")
    ),
    tag = "Wallets"
)]
pub async fn create_transaction(
    State(app_state): State<AppState>,
    Path(owner_id): Path<String>,
    Json(mut request): Json<MutationRequest>,
) -> Result<Json<TransactionOutcome>, ApiError> {
    request.owner_id = owner_id;

    let outcome = app_state
        .wallet_state
        .wallet_service
        .mutate(request)
        .await
        .map_err(|e: WalletError| -> ApiError { e.into() })?;

    Ok(Json(outcome))
}

/// 트랜잭션 취소 핸들러
/// Cancel transaction handler
#[utoipa::path(
    post,
    path = "/api/wallets/{owner_id}/transactions/cancel",
    params(
        ("owner_id" = String, Path, description = "Owner account ID")
    ),
    request_body = CancelRequest,
    responses(
        (status = 200, description = "Transaction cancelled (or previously cancelled)", body = TransactionOutcome),
        (status = 400, description = "Invalid reference_id or insufficient funds to reverse a credit"),
        (status = 404, description = "Wallet or original transaction not found"),
        (status = 409, description = "Original transaction cannot be cancelled"),
        (status = 503, description = "Wallet busy, retry later"),
        (status = 504, description = "Store timed out, outcome unknown; retry with the same reference_id")
    ),
    tag = "Wallets"
)]
pub async fn cancel_transaction(
    State(app_state): State<AppState>,
    Path(owner_id): Path<String>,
    Json(mut request): Json<CancelRequest>,
) -> Result<Json<TransactionOutcome>, ApiError> {
    request.owner_id = owner_id;

    let outcome = app_state
        .wallet_state
        .wallet_service
        .cancel(request)
        .await
        .map_err(|e: WalletError| -> ApiError { e.into() })?;

    Ok(Json(outcome))
}

/// 거래 내역 조회 핸들러
/// Transaction history handler
#[utoipa::path(
    get,
    path = "/api/wallets/{owner_id}/transactions",
    params(
        ("owner_id" = String, Path, description = "Owner account ID"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Transactions, newest first", body = TransactionHistory),
        (status = 404, description = "Wallet not found")
    ),
    tag = "Wallets"
)]
pub async fn get_transactions(
    State(app_state): State<AppState>,
    Path(owner_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<TransactionHistory>, ApiError> {
    let history = app_state
        .wallet_state
        .wallet_service
        .get_transaction_history(&owner_id, query)
        .await
        .map_err(|e: WalletError| -> ApiError { e.into() })?;

    Ok(Json(history))
}

/// reference_id로 트랜잭션 조회 핸들러
/// Look up a transaction by its idempotency key
#[utoipa::path(
    get,
    path = "/api/wallets/{owner_id}/transactions/reference/{reference_id}",
    params(
        ("owner_id" = String, Path, description = "Owner account ID"),
        ("reference_id" = String, Path, description = "Caller-supplied idempotency key")
    ),
    responses(
        (status = 200, description = "Recorded transaction", body = Transaction),
        (status = 404, description = "Wallet or transaction not found")
    ),
    tag = "Wallets"
)]
pub async fn get_transaction_by_reference(
    State(app_state): State<AppState>,
    Path((owner_id, reference_id)): Path<(String, String)>,
) -> Result<Json<Transaction>, ApiError> {
    let transaction = app_state
        .wallet_state
        .wallet_service
        .get_transaction_by_reference(&owner_id, &reference_id)
        .await
        .map_err(|e: WalletError| -> ApiError { e.into() })?;

    Ok(Json(transaction))
}
