use thiserror::Error;
use axum::{http::StatusCode, Json};
use rust_decimal::Decimal;
use serde_json::json;
use crate::shared::errors::RepositoryError;

/// 지갑 서비스 경계 에러
/// Wallet service boundary errors
///
/// 버전 충돌과 캐시 장애는 서비스 내부에서 흡수되므로 여기에 없다.
/// 호출자는 메시지 문자열이 아니라 variant로 분기한다.
#[derive(Error, Debug)]
pub enum WalletError {
    /// 소유자의 지갑이 없음
    /// No wallet for owner
    #[error("Wallet not found: owner_id={owner_id}")]
    NotFound { owner_id: String },

    /// reference_id로 기록된 트랜잭션이 없음
    /// No transaction recorded under the reference
    #[error("Transaction not found: owner_id={owner_id}, reference_id={reference_id}")]
    TransactionNotFound { owner_id: String, reference_id: String },

    /// 0 이하, 소수 4자리 초과, 또는 상한 초과 금액
    /// Amount outside the money range
    #[error("Invalid amount: {amount} (must be positive, at most 4 decimal places and at most 9999999999999999.9999)")]
    InvalidAmount { amount: Decimal },

    /// 변경 후 잔액이 상한을 넘음
    /// Resulting balance would exceed the storable limit
    #[error("Balance limit exceeded: owner_id={owner_id}")]
    BalanceLimitExceeded { owner_id: String },

    /// cancel은 전용 연산으로만 기록된다
    /// Transaction type not accepted by this operation
    #[error("Invalid transaction type for this operation: {transaction_type}")]
    InvalidTransactionType { transaction_type: String },

    /// 비어 있거나 원본과 같은 cancel reference_id
    /// Unusable reference id
    #[error("Invalid reference_id: {reference_id:?}")]
    InvalidReference { reference_id: String },

    /// 이미 취소됐거나 취소 기록 자체인 트랜잭션
    /// Transaction cannot be cancelled
    #[error("Transaction cannot be cancelled: reference_id={reference_id}")]
    NotCancellable { reference_id: String },

    /// 잔액 부족 (같은 파라미터로 재시도 불가)
    /// Insufficient funds
    #[error("Insufficient funds: required={required}, available={available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    /// 재시도 예산 소진 (호출자가 잠시 후 재시도 가능)
    /// Retry budget exhausted under contention
    #[error("Wallet is busy, retry later (gave up after {attempts} attempts)")]
    Contention { attempts: u32 },

    /// 소유자당 지갑은 1개
    /// Wallet already exists for owner
    #[error("Wallet already exists: owner_id={owner_id}")]
    WalletAlreadyExists { owner_id: String },

    /// 잘못된 통화 코드
    /// Invalid currency code
    #[error("Invalid currency code: {currency}")]
    InvalidCurrency { currency: String },

    /// 요청 통화가 지갑 통화와 다름
    /// Requested currency differs from wallet currency
    #[error("Currency mismatch: wallet={expected}, request={actual}")]
    CurrencyMismatch { expected: String, actual: String },

    /// 저장소 호출 시간 초과. 쓰기였다면 결과를 알 수 없으므로
    /// 같은 reference_id로 재시도해야 한다.
    /// Persistent store call timed out
    #[error("Persistent store timed out during {operation}; outcome unknown")]
    StoreTimeout { operation: &'static str },

    /// 데이터베이스 에러
    /// Database error
    #[error("Database error: {0}")]
    Database(String),
}

impl WalletError {
    /// 호출자가 나중에 같은 요청을 재시도해도 되는지
    /// Whether the caller may safely retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::Contention { .. } | WalletError::StoreTimeout { .. })
    }
}

impl From<RepositoryError> for WalletError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::InsufficientFunds { available, required } => {
                WalletError::InsufficientFunds { required, available }
            }
            RepositoryError::WalletNotFound { wallet } => WalletError::NotFound { owner_id: wallet },
            RepositoryError::WalletAlreadyExists { owner_id } => {
                WalletError::WalletAlreadyExists { owner_id }
            }
            RepositoryError::BalanceOverflow { wallet_id } => WalletError::BalanceLimitExceeded {
                owner_id: format!("id={}", wallet_id),
            },
            RepositoryError::NotCancellable { transaction_id } => WalletError::NotCancellable {
                reference_id: format!("id={}", transaction_id),
            },
            // 서비스가 직접 처리해야 하는 variant가 새어 나온 경우
            RepositoryError::VersionConflict { wallet_id, expected_version } => WalletError::Database(
                format!("unhandled version conflict: wallet_id={}, expected_version={}", wallet_id, expected_version),
            ),
            RepositoryError::DuplicateReference(existing) => WalletError::Database(format!(
                "unhandled duplicate reference: {:?}",
                existing.reference_id
            )),
            RepositoryError::AlreadyCancelled(existing) => WalletError::Database(format!(
                "unhandled cancel reconciliation: {:?}",
                existing.reference_id
            )),
            RepositoryError::Storage(e) => WalletError::Database(format!("{:#}", e)),
        }
    }
}

/// WalletError를 HTTP 응답으로 변환
impl From<WalletError> for (StatusCode, Json<serde_json::Value>) {
    fn from(err: WalletError) -> Self {
        let status = match &err {
            WalletError::NotFound { .. } | WalletError::TransactionNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            WalletError::InvalidAmount { .. }
            | WalletError::InsufficientFunds { .. }
            | WalletError::InvalidCurrency { .. }
            | WalletError::CurrencyMismatch { .. }
            | WalletError::BalanceLimitExceeded { .. }
            | WalletError::InvalidTransactionType { .. }
            | WalletError::InvalidReference { .. } => StatusCode::BAD_REQUEST,
            WalletError::WalletAlreadyExists { .. } | WalletError::NotCancellable { .. } => {
                StatusCode::CONFLICT
            }
            WalletError::Contention { .. } => StatusCode::SERVICE_UNAVAILABLE,
            WalletError::StoreTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            WalletError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(json!({
                "error": err.to_string(),
                "retryable": err.is_retryable(),
            })),
        )
    }
}
