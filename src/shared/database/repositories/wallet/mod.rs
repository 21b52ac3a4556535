// =====================================================
// Wallet Repository
// =====================================================
// 역할: 지갑/트랜잭션 연산을 영속 저장소의 일관된 변경으로 변환
//
// 구현체:
// - PgWalletRepository: PostgreSQL (운영)
// - InMemoryWalletRepository: 프로세스 내부 (테스트/벤치마크)
//
// Service는 trait만 참조한다 (구현체 교체 가능).
// =====================================================

pub mod pg_wallet_repository;
pub mod memory_wallet_repository;

pub use pg_wallet_repository::PgWalletRepository;
pub use memory_wallet_repository::InMemoryWalletRepository;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;
use crate::domains::wallet::models::{NewTransaction, Transaction, Wallet};
use crate::shared::errors::RepositoryError;

/// 지갑 저장소 인터페이스
/// Wallet repository interface
#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// 소유자 ID로 지갑 조회 (version 포함)
    /// Fetch current wallet state for an owner
    async fn get_wallet(&self, owner_id: &str) -> Result<Option<Wallet>, RepositoryError>;

    /// 지갑 생성 (잔액 0, version 0). 소유자당 1개.
    /// Create a wallet; at most one per owner
    async fn create_wallet(&self, owner_id: &str, currency: &str) -> Result<Wallet, RepositoryError>;

    /// 낙관적 동시성 쓰기 경로
    /// Optimistic-concurrency write path
    ///
    /// 하나의 원자적 단위 안에서:
    /// 1. reference_id가 있으면 같은 (wallet_id, reference_id) 기록이 없는지 확인
    /// 2. 현재 version == expected_version 확인
    /// 3. delta가 음수면 balance + delta >= 0 확인
    /// 4. 잔액 기록, version + 1, balance_after/status=completed로 트랜잭션 삽입
    ///
    /// 전제 조건 하나라도 실패하면 아무것도 반영되지 않는다.
    ///
    /// # Returns
    /// * `Ok((Wallet, Transaction))` - 커밋된 지갑과 트랜잭션
    /// * `Err(VersionConflict)` - 다른 쓰기가 먼저 커밋됨 (재조회 후 재시도)
    /// * `Err(InsufficientFunds)` - 잔액 부족 (재시도 금지)
    /// * `Err(DuplicateReference)` - 이미 적용됨 (기록된 트랜잭션 포함)
    async fn apply_mutation(
        &self,
        wallet_id: u64,
        expected_version: i64,
        delta: Decimal,
        transaction: NewTransaction,
    ) -> Result<(Wallet, Transaction), RepositoryError>;

    /// 완료된 트랜잭션 취소 (apply_mutation과 같은 원자성)
    /// Reverse a completed transaction in one atomic unit
    ///
    /// 1. cancel의 reference_id 중복 확인
    /// 2. 원본 확인: 이미 취소됐으면 기존 cancel 기록, cancel 기록이면 취소 불가
    /// 3. version 확인, 원본의 반대 방향으로 잔액 확인
    /// 4. 잔액 기록, version + 1, 원본 status=cancelled,
    ///    원본 금액과 ref_transaction_id를 가진 cancel 기록 삽입
    ///
    /// # Returns
    /// * `Ok((Wallet, Transaction))` - 커밋된 지갑과 cancel 기록
    /// * `Err(AlreadyCancelled)` - 원본이 이미 취소됨 (기존 cancel 기록 포함)
    /// * `Err(NotCancellable)` - 원본이 cancel 기록이거나 완료 상태가 아님
    /// * 그 외는 apply_mutation과 같다
    async fn apply_cancel(
        &self,
        wallet_id: u64,
        expected_version: i64,
        original_id: Uuid,
        transaction: NewTransaction,
    ) -> Result<(Wallet, Transaction), RepositoryError>;

    /// reference_id로 기존 트랜잭션 조회
    async fn find_by_reference(
        &self,
        wallet_id: u64,
        reference_id: &str,
    ) -> Result<Option<Transaction>, RepositoryError>;

    /// 거래 내역 (최신순) + 전체 건수
    /// Transaction history, newest first, with total count
    async fn list_transactions(
        &self,
        wallet_id: u64,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<Transaction>, u64), RepositoryError>;
}
