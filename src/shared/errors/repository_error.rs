use thiserror::Error;
use rust_decimal::Decimal;
use uuid::Uuid;
use crate::domains::wallet::models::Transaction;

/// Wallet Repository 결과 에러
/// Wallet repository errors
///
/// - VersionConflict: 동시 쓰기 경쟁에서 짐, 다시 조회 후 재시도
/// - InsufficientFunds: 비즈니스 거절, 같은 delta로 재시도 금지
/// - DuplicateReference: 이미 적용된 요청, 기록된 트랜잭션을 돌려줌
/// - AlreadyCancelled: 원본이 이미 취소됨, 기존 cancel 기록을 돌려줌
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Version conflict: wallet_id={wallet_id}, expected_version={expected_version}")]
    VersionConflict { wallet_id: u64, expected_version: i64 },

    #[error("Insufficient funds: available={available}, required={required}")]
    InsufficientFunds { available: Decimal, required: Decimal },

    #[error("Duplicate reference: transaction {} already applied", .0.id)]
    DuplicateReference(Box<Transaction>),

    /// wallet: owner_id 또는 "id=<wallet_id>"
    #[error("Wallet not found: {wallet}")]
    WalletNotFound { wallet: String },

    #[error("Transaction {} already cancelled", .0.ref_transaction_id.unwrap_or_default())]
    AlreadyCancelled(Box<Transaction>),

    #[error("Transaction cannot be cancelled: id={transaction_id}")]
    NotCancellable { transaction_id: Uuid },

    /// 잔액이 컬럼 범위를 넘음 (Decimal overflow 포함)
    #[error("Balance limit exceeded: wallet_id={wallet_id}")]
    BalanceOverflow { wallet_id: u64 },

    #[error("Wallet already exists: owner_id={owner_id}")]
    WalletAlreadyExists { owner_id: String },

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::Storage(anyhow::Error::new(err))
    }
}

/// PostgreSQL unique 제약 위반 여부 (SQLSTATE 23505)
/// Whether the error is a unique-constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
