// =====================================================
// InMemoryWalletRepository - 프로세스 내부 지갑 저장소
// =====================================================
// 역할: PostgreSQL 없이 같은 의미(semantics)로 동작하는 저장소
//       (통합 테스트, 벤치마크용)
//
// 핵심 설계:
// 1. 모든 상태를 하나의 Mutex 뒤에 둔다
// 2. apply_mutation의 검사와 쓰기는 한 번의 잠금 안에서 끝난다
//    → PostgreSQL 트랜잭션 1건과 같은 원자성
// 3. await 지점에서 잠금을 들고 있지 않는다
// =====================================================

use std::collections::HashMap;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use uuid::Uuid;
use crate::domains::wallet::models::{
    max_money, NewTransaction, Transaction, TransactionStatus, TransactionType, Wallet,
};
use crate::shared::errors::RepositoryError;
use super::WalletRepository;

#[derive(Default)]
struct LedgerState {
    next_wallet_id: u64,
    wallets: HashMap<u64, Wallet>,
    /// owner_id -> wallet_id
    owners: HashMap<String, u64>,
    /// wallet_id -> 트랜잭션 (추가 순서)
    transactions: HashMap<u64, Vec<Transaction>>,
    /// (wallet_id, reference_id) -> transactions 인덱스
    references: HashMap<(u64, String), usize>,
    /// 원본 트랜잭션 ID -> cancel 기록 인덱스
    cancels: HashMap<Uuid, usize>,
}

impl LedgerState {
    fn find_reference(&self, wallet_id: u64, reference_id: &str) -> Option<&Transaction> {
        let index = *self.references.get(&(wallet_id, reference_id.to_string()))?;
        self.transactions.get(&wallet_id).and_then(|txs| txs.get(index))
    }

    /// 검사(중복 reference, version, 잔액 범위)를 통과한 새 잔액
    fn checked_balance(
        &self,
        wallet_id: u64,
        expected_version: i64,
        delta: Decimal,
        reference_id: Option<&str>,
    ) -> Result<Decimal, RepositoryError> {
        if let Some(reference_id) = reference_id {
            if let Some(existing) = self.find_reference(wallet_id, reference_id) {
                return Err(RepositoryError::DuplicateReference(Box::new(existing.clone())));
            }
        }

        let current = self
            .wallets
            .get(&wallet_id)
            .ok_or_else(|| RepositoryError::WalletNotFound { wallet: format!("id={}", wallet_id) })?;

        if current.version != expected_version {
            return Err(RepositoryError::VersionConflict { wallet_id, expected_version });
        }

        let new_balance = current
            .balance
            .checked_add(delta)
            .ok_or(RepositoryError::BalanceOverflow { wallet_id })?;
        if new_balance < Decimal::ZERO {
            return Err(RepositoryError::InsufficientFunds {
                available: current.balance,
                required: -delta,
            });
        }
        if new_balance > max_money() {
            return Err(RepositoryError::BalanceOverflow { wallet_id });
        }
        Ok(new_balance)
    }

    /// 검사 완료 후 잔액과 트랜잭션을 한 번에 기록 (실패하지 않음)
    fn commit(
        &mut self,
        wallet_id: u64,
        new_balance: Decimal,
        transaction: NewTransaction,
    ) -> Result<(Wallet, Transaction), RepositoryError> {
        let now = Utc::now();
        let wallet = self
            .wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| RepositoryError::WalletNotFound { wallet: format!("id={}", wallet_id) })?;
        wallet.balance = new_balance;
        wallet.version += 1;
        wallet.updated_at = now;
        let updated = wallet.clone();

        let recorded = Transaction {
            id: transaction.id,
            wallet_id,
            transaction_type: transaction.transaction_type,
            status: TransactionStatus::Completed,
            amount: transaction.amount,
            balance_after: new_balance,
            currency: transaction.currency,
            reference_id: transaction.reference_id,
            game_id: transaction.game_id,
            description: transaction.description,
            ref_transaction_id: transaction.ref_transaction_id,
            created_at: now,
            updated_at: now,
        };

        let history = self.transactions.entry(wallet_id).or_default();
        history.push(recorded.clone());
        let index = history.len() - 1;
        if let Some(reference_id) = &recorded.reference_id {
            self.references.insert((wallet_id, reference_id.clone()), index);
        }
        if let Some(original_id) = recorded.ref_transaction_id {
            self.cancels.insert(original_id, index);
        }

        Ok((updated, recorded))
    }

    fn insert_wallet(&mut self, owner_id: &str, currency: &str, balance: Decimal, version: i64) -> Wallet {
        self.next_wallet_id += 1;
        let now = Utc::now();
        let wallet = Wallet {
            id: self.next_wallet_id,
            owner_id: owner_id.to_string(),
            balance,
            currency: currency.to_string(),
            version,
            created_at: now,
            updated_at: now,
        };
        self.wallets.insert(wallet.id, wallet.clone());
        self.owners.insert(owner_id.to_string(), wallet.id);
        wallet
    }
}

/// 메모리 기반 지갑 저장소
/// In-process wallet repository with the same atomicity as the SQL one
#[derive(Default)]
pub struct InMemoryWalletRepository {
    state: Mutex<LedgerState>,
}

impl InMemoryWalletRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 초기 잔액/버전을 지정해 지갑 생성 (테스트용)
    /// Seed a wallet with an explicit balance and version
    pub fn seed_wallet(&self, owner_id: &str, currency: &str, balance: Decimal, version: i64) -> Wallet {
        self.state.lock().insert_wallet(owner_id, currency, balance, version)
    }

    /// 지갑의 트랜잭션 건수
    pub fn transaction_count(&self, wallet_id: u64) -> usize {
        self.state
            .lock()
            .transactions
            .get(&wallet_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl WalletRepository for InMemoryWalletRepository {
    async fn get_wallet(&self, owner_id: &str) -> Result<Option<Wallet>, RepositoryError> {
        let state = self.state.lock();
        Ok(state
            .owners
            .get(owner_id)
            .and_then(|id| state.wallets.get(id))
            .cloned())
    }

    async fn create_wallet(&self, owner_id: &str, currency: &str) -> Result<Wallet, RepositoryError> {
        let mut state = self.state.lock();
        if state.owners.contains_key(owner_id) {
            return Err(RepositoryError::WalletAlreadyExists {
                owner_id: owner_id.to_string(),
            });
        }
        Ok(state.insert_wallet(owner_id, currency, Decimal::ZERO, 0))
    }

    async fn apply_mutation(
        &self,
        wallet_id: u64,
        expected_version: i64,
        delta: Decimal,
        transaction: NewTransaction,
    ) -> Result<(Wallet, Transaction), RepositoryError> {
        let mut state = self.state.lock();
        let new_balance = state.checked_balance(
            wallet_id,
            expected_version,
            delta,
            transaction.reference_id.as_deref(),
        )?;
        state.commit(wallet_id, new_balance, transaction)
    }

    async fn apply_cancel(
        &self,
        wallet_id: u64,
        expected_version: i64,
        original_id: Uuid,
        transaction: NewTransaction,
    ) -> Result<(Wallet, Transaction), RepositoryError> {
        let mut state = self.state.lock();

        if let Some(reference_id) = transaction.reference_id.as_deref() {
            if let Some(existing) = state.find_reference(wallet_id, reference_id) {
                return Err(RepositoryError::DuplicateReference(Box::new(existing.clone())));
            }
        }

        let history = state.transactions.get(&wallet_id);
        let original_index = history
            .and_then(|txs| txs.iter().position(|t| t.id == original_id))
            .ok_or_else(|| anyhow::anyhow!("Original transaction {} not found", original_id))?;
        let original = history
            .and_then(|txs| txs.get(original_index))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Original transaction {} not found", original_id))?;

        if original.status == TransactionStatus::Cancelled {
            let existing = state
                .cancels
                .get(&original_id)
                .and_then(|index| history.and_then(|txs| txs.get(*index)))
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Cancel record for {} missing", original_id))?;
            return Err(RepositoryError::AlreadyCancelled(Box::new(existing)));
        }
        if !original.is_cancellable() {
            return Err(RepositoryError::NotCancellable { transaction_id: original_id });
        }

        let new_balance = state.checked_balance(wallet_id, expected_version, original.reversal_delta(), None)?;

        let cancel = NewTransaction {
            transaction_type: TransactionType::Cancel,
            amount: original.amount,
            ref_transaction_id: Some(original_id),
            ..transaction
        };
        let (updated, recorded) = state.commit(wallet_id, new_balance, cancel)?;

        if let Some(original) = state
            .transactions
            .get_mut(&wallet_id)
            .and_then(|txs| txs.get_mut(original_index))
        {
            original.status = TransactionStatus::Cancelled;
            original.updated_at = recorded.created_at;
        }

        Ok((updated, recorded))
    }

    async fn find_by_reference(
        &self,
        wallet_id: u64,
        reference_id: &str,
    ) -> Result<Option<Transaction>, RepositoryError> {
        Ok(self.state.lock().find_reference(wallet_id, reference_id).cloned())
    }

    async fn list_transactions(
        &self,
        wallet_id: u64,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<Transaction>, u64), RepositoryError> {
        let state = self.state.lock();
        let history = match state.transactions.get(&wallet_id) {
            Some(history) => history,
            None => return Ok((Vec::new(), 0)),
        };

        // 최신순
        let page = history
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok((page, history.len() as u64))
    }
}
