// Wallet domain routes
// 지갑 도메인 라우터
use axum::{routing::{get, post}, Router};
use crate::domains::wallet::handlers::wallet_handler;
use crate::shared::services::AppState;

/// Create wallet router
/// 지갑 라우터 생성
pub fn create_wallet_router() -> Router<AppState> {
    Router::new()
        .route("/:owner_id", post(wallet_handler::create_wallet))
        .route("/:owner_id/balance", get(wallet_handler::get_balance))
        .route(
            "/:owner_id/transactions",
            post(wallet_handler::create_transaction).get(wallet_handler::get_transactions),
        )
        .route("/:owner_id/transactions/cancel", post(wallet_handler::cancel_transaction))
        .route(
            "/:owner_id/transactions/reference/:reference_id",
            get(wallet_handler::get_transaction_by_reference),
        )
}
