// =====================================================
// WalletService - 잔액 조회/변경 비즈니스 로직
// =====================================================
// 역할: cache-aside 조회, 낙관적 동시성 쓰기 재시도, 멱등성 처리
//
// 조회 흐름 (get_balance):
// 1. 캐시 hit → 그대로 반환 (cache_hit = true)
// 2. miss → 저장소 조회 → TTL과 함께 캐시 채움 (cache_hit = false)
//
// 쓰기 흐름 (mutate):
// 1. 금액/통화 검증
// 2. 지갑 조회 → reference_id가 이미 적용됐으면 기록된 결과 반환
// 3. apply_mutation(version) 시도
//    - VersionConflict → 재조회 후 재시도 (최대 max_attempts)
//    - InsufficientFunds → 즉시 실패
//    - DuplicateReference → 기록된 결과로 정리 (reconciled)
// 4. 성공 시 캐시 항목 삭제 (덮어쓰지 않음)
//
// 취소 흐름 (cancel):
// 1. cancel reference_id가 이미 있으면 기록된 결과 반환
// 2. 원본 조회 → 같은 쓰기 루프로 apply_cancel
//    - AlreadyCancelled → 기존 cancel 기록으로 정리 (원본당 1건)
//
// 캐시 장애는 절대 호출자에게 전달되지 않는다.
// 모든 캐시/저장소 호출에는 timeout이 걸린다.
// =====================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;
use crate::domains::wallet::models::{
    is_valid_amount, is_valid_currency, BalanceSnapshot, CancelRequest, HistoryQuery,
    MutationRequest, NewTransaction, Transaction, TransactionHistory, TransactionOutcome,
    TransactionStatus, TransactionType, Wallet,
};
use crate::shared::cache::{balance_key, BalanceCache};
use crate::shared::config::AppConfig;
use crate::shared::database::WalletRepository;
use crate::shared::errors::{CacheError, RepositoryError, WalletError};

/// 거래 내역 기본 페이지 크기
const DEFAULT_HISTORY_LIMIT: u32 = 10;
/// 거래 내역 최대 페이지 크기
const MAX_HISTORY_LIMIT: u32 = 100;
/// 백오프 지수 상한 (base * 2^6)
const MAX_BACKOFF_EXPONENT: u32 = 6;

/// WalletService 동작 파라미터
/// Tunables for the wallet service
#[derive(Debug, Clone)]
pub struct WalletServiceConfig {
    pub cache_key_prefix: String,
    pub balance_ttl: Duration,
    pub cache_timeout: Duration,
    pub store_timeout: Duration,
    /// 첫 시도 포함
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
}

impl Default for WalletServiceConfig {
    fn default() -> Self {
        Self {
            cache_key_prefix: "casino:".to_string(),
            balance_ttl: Duration::from_secs(60),
            cache_timeout: Duration::from_millis(250),
            store_timeout: Duration::from_secs(5),
            max_attempts: 5,
            retry_base_delay: Duration::from_millis(10),
        }
    }
}

impl From<&AppConfig> for WalletServiceConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            cache_key_prefix: config.cache_key_prefix.clone(),
            balance_ttl: config.balance_cache_ttl(),
            cache_timeout: config.cache_timeout(),
            store_timeout: config.store_timeout(),
            max_attempts: config.mutation_max_attempts.max(1),
            retry_base_delay: config.retry_base_delay(),
        }
    }
}

/// 쓰기 시도 1회의 결과
enum AttemptOutcome {
    Applied(Wallet, Transaction),
    Retry,
    Failed(WalletError),
    Reconciled(Transaction),
}

/// 쓰기 루프의 최종 결과
enum Settled {
    Applied(Wallet, Transaction),
    Reconciled(Transaction),
}

/// 지갑 서비스
/// WalletService: balance reads and credit/debit mutations
#[derive(Clone)]
pub struct WalletService {
    repository: Arc<dyn WalletRepository>,
    cache: Arc<dyn BalanceCache>,
    config: WalletServiceConfig,
}

impl WalletService {
    /// 생성자 (저장소와 캐시는 시작 시점에 한 번 만들어 주입)
    /// Constructor
    pub fn new(
        repository: Arc<dyn WalletRepository>,
        cache: Arc<dyn BalanceCache>,
        config: WalletServiceConfig,
    ) -> Self {
        Self { repository, cache, config }
    }

    pub fn config(&self) -> &WalletServiceConfig {
        &self.config
    }

    /// 새 지갑 생성 (잔액 0, version 0)
    /// Create a wallet for an owner
    pub async fn create_wallet(&self, owner_id: &str, currency: &str) -> Result<Wallet, WalletError> {
        if !is_valid_currency(currency) {
            return Err(WalletError::InvalidCurrency { currency: currency.to_string() });
        }

        let wallet = self
            .store("create_wallet", self.repository.create_wallet(owner_id, currency))
            .await??;

        info!(owner_id = %owner_id, wallet_id = wallet.id, currency = %currency, "Wallet created");
        Ok(wallet)
    }

    /// 잔액 조회 (cache-aside)
    /// Balance read through the cache
    ///
    /// # Returns
    /// * `Ok((snapshot, cache_hit))`
    /// * `Err(WalletError::NotFound)` - 지갑 없음 (캐시에 기록하지 않음)
    pub async fn get_balance(&self, owner_id: &str) -> Result<(BalanceSnapshot, bool), WalletError> {
        let key = balance_key(&self.config.cache_key_prefix, owner_id);

        if let Some(snapshot) = self.cache_get(&key).await {
            debug!(owner_id = %owner_id, "Balance cache hit");
            return Ok((snapshot, true));
        }

        let wallet = self.load_wallet(owner_id).await?;
        let snapshot = BalanceSnapshot::from(&wallet);
        self.cache_set(&key, &snapshot).await;

        Ok((snapshot, false))
    }

    /// 잔액 변경 (입금/출금/베팅/당첨/보너스/환불)
    /// Credit or debit a wallet
    ///
    /// 같은 reference_id로 다시 호출하면 처음 기록된 결과를 그대로 돌려준다.
    pub async fn mutate(&self, request: MutationRequest) -> Result<TransactionOutcome, WalletError> {
        // 1. 입력 검증
        if !is_valid_amount(request.amount) {
            return Err(WalletError::InvalidAmount { amount: request.amount });
        }
        if request.transaction_type == TransactionType::Cancel {
            return Err(WalletError::InvalidTransactionType {
                transaction_type: request.transaction_type.to_string(),
            });
        }
        if let Some(currency) = request.currency.as_deref() {
            if !is_valid_currency(currency) {
                return Err(WalletError::InvalidCurrency { currency: currency.to_string() });
            }
        }

        let owner_id = request.owner_id.as_str();
        let wallet = self.load_wallet(owner_id).await?;

        if let Some(currency) = request.currency.as_deref() {
            if currency != wallet.currency {
                return Err(WalletError::CurrencyMismatch {
                    expected: wallet.currency.clone(),
                    actual: currency.to_string(),
                });
            }
        }

        // 2. 이미 적용된 요청이면 단락
        if let Some(reference_id) = request.reference_id.as_deref() {
            let existing = self
                .store("find_by_reference", self.repository.find_by_reference(wallet.id, reference_id))
                .await??;
            if let Some(existing) = existing {
                return Ok(self.reconcile(&request, existing));
            }
        }

        // 3. 낙관적 쓰기 루프
        let delta = request.transaction_type.signed_delta(request.amount);
        let envelope = NewTransaction {
            id: Uuid::new_v4(),
            transaction_type: request.transaction_type,
            amount: request.amount,
            currency: wallet.currency.clone(),
            reference_id: request.reference_id.clone(),
            game_id: request.game_id.clone(),
            description: request.description.clone(),
            ref_transaction_id: None,
        };

        let settled = self
            .write_with_retry(owner_id, wallet, "apply_mutation", |wallet_id, version| {
                self.repository.apply_mutation(wallet_id, version, delta, envelope.clone())
            })
            .await?;

        match settled {
            Settled::Applied(updated, recorded) => {
                info!(
                    owner_id = %owner_id,
                    transaction_id = %recorded.id,
                    transaction_type = %recorded.transaction_type,
                    amount = %recorded.amount,
                    balance = %updated.balance,
                    version = updated.version,
                    "Wallet mutation applied"
                );
                Ok(TransactionOutcome::from_record(owner_id, &recorded))
            }
            Settled::Reconciled(existing) => Ok(self.reconcile(&request, existing)),
        }
    }

    /// 완료된 트랜잭션 취소 (원본의 반대 방향으로 잔액 변경)
    /// Cancel a completed transaction
    ///
    /// cancel의 reference_id로도, 원본 기준으로도 멱등하다.
    /// 같은 원본을 다시 취소하면 처음 기록된 cancel 결과가 반환된다.
    pub async fn cancel(&self, request: CancelRequest) -> Result<TransactionOutcome, WalletError> {
        // 1. 입력 검증
        if request.reference_id.is_empty() || request.reference_id == request.original_reference_id {
            return Err(WalletError::InvalidReference { reference_id: request.reference_id.clone() });
        }

        let owner_id = request.owner_id.as_str();
        let wallet = self.load_wallet(owner_id).await?;

        // 2. 이미 처리된 cancel이면 단락
        let existing = self
            .store("find_by_reference", self.repository.find_by_reference(wallet.id, &request.reference_id))
            .await??;
        if let Some(existing) = existing {
            return Ok(self.reconcile_cancel(&request, None, existing));
        }

        // 3. 원본 조회
        let original = self
            .store(
                "find_by_reference",
                self.repository.find_by_reference(wallet.id, &request.original_reference_id),
            )
            .await??
            .ok_or_else(|| WalletError::TransactionNotFound {
                owner_id: owner_id.to_string(),
                reference_id: request.original_reference_id.clone(),
            })?;
        if original.status != TransactionStatus::Cancelled && !original.is_cancellable() {
            return Err(WalletError::NotCancellable { reference_id: request.original_reference_id.clone() });
        }

        // 4. 낙관적 쓰기 루프 (원본 상태는 저장소가 같은 단위 안에서 다시 확인)
        let original_id = original.id;
        let envelope = NewTransaction {
            id: Uuid::new_v4(),
            transaction_type: TransactionType::Cancel,
            amount: original.amount,
            currency: wallet.currency.clone(),
            reference_id: Some(request.reference_id.clone()),
            game_id: original.game_id.clone(),
            description: request.description.clone(),
            ref_transaction_id: Some(original_id),
        };

        let settled = self
            .write_with_retry(owner_id, wallet, "apply_cancel", |wallet_id, version| {
                self.repository.apply_cancel(wallet_id, version, original_id, envelope.clone())
            })
            .await?;

        match settled {
            Settled::Applied(updated, recorded) => {
                info!(
                    owner_id = %owner_id,
                    transaction_id = %recorded.id,
                    original_transaction_id = %original_id,
                    original_type = %original.transaction_type,
                    amount = %recorded.amount,
                    balance = %updated.balance,
                    version = updated.version,
                    "Wallet transaction cancelled"
                );
                Ok(TransactionOutcome::from_record(owner_id, &recorded))
            }
            Settled::Reconciled(existing) => Ok(self.reconcile_cancel(&request, Some(original_id), existing)),
        }
    }

    /// 거래 내역 (최신순)
    /// Transaction history, newest first
    pub async fn get_transaction_history(
        &self,
        owner_id: &str,
        query: HistoryQuery,
    ) -> Result<TransactionHistory, WalletError> {
        let limit = query
            .limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        let offset = query.offset.unwrap_or(0);

        let wallet = self.load_wallet(owner_id).await?;
        let (transactions, total) = self
            .store("list_transactions", self.repository.list_transactions(wallet.id, limit, offset))
            .await??;

        Ok(TransactionHistory {
            owner_id: owner_id.to_string(),
            transactions,
            total,
            limit,
            offset,
        })
    }

    /// reference_id로 트랜잭션 조회
    /// 저장소 timeout 뒤 결과를 확인할 때 사용
    pub async fn get_transaction_by_reference(
        &self,
        owner_id: &str,
        reference_id: &str,
    ) -> Result<Transaction, WalletError> {
        let wallet = self.load_wallet(owner_id).await?;
        self.store("find_by_reference", self.repository.find_by_reference(wallet.id, reference_id))
            .await??
            .ok_or_else(|| WalletError::TransactionNotFound {
                owner_id: owner_id.to_string(),
                reference_id: reference_id.to_string(),
            })
    }

    // =====================================================
    // 내부 헬퍼
    // =====================================================

    /// 낙관적 쓰기 루프: 충돌이면 백오프 후 최신 version으로 재시도
    /// 성공하면 캐시 항목을 삭제한다
    async fn write_with_retry<F, Fut>(
        &self,
        owner_id: &str,
        mut wallet: Wallet,
        operation: &'static str,
        mut write: F,
    ) -> Result<Settled, WalletError>
    where
        F: FnMut(u64, i64) -> Fut,
        Fut: Future<Output = Result<(Wallet, Transaction), RepositoryError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let call = write(wallet.id, wallet.version);
            match self.attempt(owner_id, operation, call).await? {
                AttemptOutcome::Applied(updated, recorded) => {
                    self.invalidate_balance(owner_id).await;
                    debug!(owner_id = %owner_id, operation, attempt, "Write applied");
                    return Ok(Settled::Applied(updated, recorded));
                }
                AttemptOutcome::Reconciled(existing) => return Ok(Settled::Reconciled(existing)),
                AttemptOutcome::Failed(err) => return Err(err),
                AttemptOutcome::Retry => {
                    debug!(
                        owner_id = %owner_id,
                        operation,
                        attempt,
                        expected_version = wallet.version,
                        "Version conflict, retrying with fresh state"
                    );
                    if attempt == max_attempts {
                        break;
                    }
                    tokio::time::sleep(self.backoff(attempt)).await;
                    wallet = self.load_wallet(owner_id).await?;
                }
            }
        }

        warn!(owner_id = %owner_id, operation, attempts = max_attempts, "Wallet write gave up under contention");
        Err(WalletError::Contention { attempts: max_attempts })
    }

    async fn attempt<F>(
        &self,
        owner_id: &str,
        operation: &'static str,
        call: F,
    ) -> Result<AttemptOutcome, WalletError>
    where
        F: Future<Output = Result<(Wallet, Transaction), RepositoryError>>,
    {
        let result = self.store(operation, call).await?;

        Ok(match result {
            Ok((updated, recorded)) => AttemptOutcome::Applied(updated, recorded),
            Err(RepositoryError::VersionConflict { .. }) => AttemptOutcome::Retry,
            Err(RepositoryError::InsufficientFunds { available, required }) => {
                AttemptOutcome::Failed(WalletError::InsufficientFunds { required, available })
            }
            Err(RepositoryError::BalanceOverflow { .. }) => {
                AttemptOutcome::Failed(WalletError::BalanceLimitExceeded { owner_id: owner_id.to_string() })
            }
            Err(RepositoryError::DuplicateReference(existing))
            | Err(RepositoryError::AlreadyCancelled(existing)) => AttemptOutcome::Reconciled(*existing),
            Err(other) => AttemptOutcome::Failed(other.into()),
        })
    }

    /// 이미 기록된 트랜잭션을 결과로 변환 (파라미터가 달라도 기록이 우선)
    fn reconcile(&self, request: &MutationRequest, existing: Transaction) -> TransactionOutcome {
        if existing.amount != request.amount || existing.transaction_type != request.transaction_type {
            warn!(
                owner_id = %request.owner_id,
                reference_id = ?existing.reference_id,
                recorded_amount = %existing.amount,
                requested_amount = %request.amount,
                "Reference reused with different parameters; returning recorded outcome"
            );
        } else {
            info!(
                owner_id = %request.owner_id,
                reference_id = ?existing.reference_id,
                transaction_id = %existing.id,
                "Duplicate reference reconciled"
            );
        }
        TransactionOutcome::from_record(&request.owner_id, &existing)
    }

    /// 이미 기록된 cancel(또는 같은 키의 다른 기록)을 결과로 변환
    fn reconcile_cancel(
        &self,
        request: &CancelRequest,
        original_id: Option<Uuid>,
        existing: Transaction,
    ) -> TransactionOutcome {
        let same_target = existing.transaction_type == TransactionType::Cancel
            && original_id.map_or(true, |id| existing.ref_transaction_id == Some(id));
        if same_target {
            info!(
                owner_id = %request.owner_id,
                reference_id = %request.reference_id,
                recorded_reference_id = ?existing.reference_id,
                transaction_id = %existing.id,
                "Cancel already recorded"
            );
        } else {
            warn!(
                owner_id = %request.owner_id,
                reference_id = %request.reference_id,
                original_reference_id = %request.original_reference_id,
                recorded_type = %existing.transaction_type,
                "Cancel reference reused for a different transaction; returning recorded outcome"
            );
        }
        TransactionOutcome::from_record(&request.owner_id, &existing)
    }

    async fn load_wallet(&self, owner_id: &str) -> Result<Wallet, WalletError> {
        self.store("get_wallet", self.repository.get_wallet(owner_id))
            .await??
            .ok_or_else(|| WalletError::NotFound { owner_id: owner_id.to_string() })
    }

    /// 저장소 호출에 timeout 적용. 바깥 Err는 timeout, 안쪽은 저장소 결과.
    async fn store<T, F>(
        &self,
        operation: &'static str,
        call: F,
    ) -> Result<Result<T, RepositoryError>, WalletError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        tokio::time::timeout(self.config.store_timeout, call)
            .await
            .map_err(|_| {
                warn!(operation, timeout_ms = self.config.store_timeout.as_millis() as u64, "Store call timed out");
                WalletError::StoreTimeout { operation }
            })
    }

    /// 지수 백오프 + jitter
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.config.retry_base_delay;
        let exponent = attempt.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        let delay = base * 2u32.pow(exponent);
        let jitter_ms = rand::thread_rng().gen_range(0..=base.as_millis() as u64);
        delay + Duration::from_millis(jitter_ms)
    }

    async fn cache_get(&self, key: &str) -> Option<BalanceSnapshot> {
        match self.with_cache_timeout(self.cache.get(key)).await {
            Ok(found) => found,
            Err(e) => {
                warn!(key = %key, backend = self.cache.backend(), error = %e, "Balance cache read failed, using store");
                None
            }
        }
    }

    async fn cache_set(&self, key: &str, snapshot: &BalanceSnapshot) {
        if let Err(e) = self
            .with_cache_timeout(self.cache.set(key, snapshot, self.config.balance_ttl))
            .await
        {
            warn!(key = %key, backend = self.cache.backend(), error = %e, "Balance cache populate failed");
        }
    }

    async fn invalidate_balance(&self, owner_id: &str) {
        let key = balance_key(&self.config.cache_key_prefix, owner_id);
        if let Err(e) = self.with_cache_timeout(self.cache.delete(&key)).await {
            warn!(key = %key, backend = self.cache.backend(), error = %e, "Balance cache invalidation failed");
        }
    }

    async fn with_cache_timeout<T, F>(&self, call: F) -> Result<T, CacheError>
    where
        F: Future<Output = Result<T, CacheError>>,
    {
        tokio::time::timeout(self.config.cache_timeout, call)
            .await
            .map_err(|_| CacheError::Timeout)?
    }
}
