use sqlx::{PgConnection, PgPool, Row};
use sqlx::postgres::PgRow;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use crate::domains::wallet::models::{
    max_money, NewTransaction, Transaction, TransactionStatus, TransactionType, Wallet,
};
use crate::shared::errors::{is_unique_violation, RepositoryError};
use super::WalletRepository;

const WALLET_COLUMNS: &str = "id, owner_id, balance, currency, version, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, wallet_id, transaction_type, status, amount, balance_after, \
     currency, reference_id, game_id, description, ref_transaction_id, created_at, updated_at";

// PostgreSQL 지갑 레포지토리
// PgWalletRepository: handles all database operations for wallets and wallet transactions
#[derive(Clone)]
pub struct PgWalletRepository {
    pool: PgPool,
}

impl PgWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_wallet(row: &PgRow) -> Wallet {
        Wallet {
            id: row.get::<i64, _>("id") as u64,
            owner_id: row.get("owner_id"),
            balance: row.get("balance"),
            currency: row.get("currency"),
            version: row.get("version"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    fn map_transaction(row: &PgRow) -> Result<Transaction, RepositoryError> {
        let transaction_type = row
            .get::<String, _>("transaction_type")
            .parse::<TransactionType>()
            .context("Invalid transaction_type in wallet_transactions")?;
        let status = row
            .get::<String, _>("status")
            .parse::<TransactionStatus>()
            .context("Invalid status in wallet_transactions")?;

        Ok(Transaction {
            id: row.get::<Uuid, _>("id"),
            wallet_id: row.get::<i64, _>("wallet_id") as u64,
            transaction_type,
            status,
            amount: row.get("amount"),
            balance_after: row.get("balance_after"),
            currency: row.get("currency"),
            reference_id: row.get("reference_id"),
            game_id: row.get("game_id"),
            description: row.get("description"),
            ref_transaction_id: row.get::<Option<Uuid>, _>("ref_transaction_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    async fn reference_in(
        conn: &mut PgConnection,
        wallet_id: u64,
        reference_id: &str,
    ) -> Result<Option<Transaction>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM wallet_transactions WHERE wallet_id = $1 AND reference_id = $2",
            TRANSACTION_COLUMNS
        ))
        .bind(wallet_id as i64)
        .bind(reference_id)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to check transaction reference")?;

        row.as_ref().map(Self::map_transaction).transpose()
    }

    /// 버전/잔액 검사를 통과한 새 잔액
    async fn checked_balance(
        conn: &mut PgConnection,
        wallet_id: u64,
        expected_version: i64,
        delta: Decimal,
    ) -> Result<Decimal, RepositoryError> {
        let current = sqlx::query(&format!("SELECT {} FROM wallets WHERE id = $1", WALLET_COLUMNS))
            .bind(wallet_id as i64)
            .fetch_optional(&mut *conn)
            .await
            .context("Failed to load wallet for mutation")?
            .map(|row| Self::map_wallet(&row))
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
        // NUMERIC(20, 4) 범위를 넘으면 DB 에러 대신 도메인 에러
        if new_balance > max_money() {
            return Err(RepositoryError::BalanceOverflow { wallet_id });
        }
        Ok(new_balance)
    }

    /// 버전 조건부 갱신: 0행이면 그 사이 다른 쓰기가 커밋된 것
    async fn write_balance(
        conn: &mut PgConnection,
        wallet_id: u64,
        expected_version: i64,
        new_balance: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Wallet, RepositoryError> {
        let updated = sqlx::query(&format!(
            r#"
            UPDATE wallets
            SET balance = $1, version = version + 1, updated_at = $2
            WHERE id = $3 AND version = $4
            RETURNING {}
            "#,
            WALLET_COLUMNS
        ))
        .bind(new_balance)
        .bind(now)
        .bind(wallet_id as i64)
        .bind(expected_version)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to update wallet balance")?;

        match updated {
            Some(row) => Ok(Self::map_wallet(&row)),
            None => Err(RepositoryError::VersionConflict { wallet_id, expected_version }),
        }
    }

    async fn insert_transaction(
        conn: &mut PgConnection,
        wallet_id: u64,
        balance_after: Decimal,
        transaction: &NewTransaction,
        now: DateTime<Utc>,
    ) -> Result<PgRow, sqlx::Error> {
        sqlx::query(&format!(
            r#"
            INSERT INTO wallet_transactions
                (id, wallet_id, transaction_type, status, amount, balance_after, currency,
                 reference_id, game_id, description, ref_transaction_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(transaction.id)
        .bind(wallet_id as i64)
        .bind(transaction.transaction_type.as_str())
        .bind(TransactionStatus::Completed.as_str())
        .bind(transaction.amount)
        .bind(balance_after)
        .bind(&transaction.currency)
        .bind(&transaction.reference_id)
        .bind(&transaction.game_id)
        .bind(&transaction.description)
        .bind(transaction.ref_transaction_id)
        .bind(now)
        .fetch_one(&mut *conn)
        .await
    }

    /// 삽입 중 unique 위반: 같은 reference를 가진 동시 요청이 먼저 커밋됨
    async fn after_unique_violation(
        &self,
        wallet_id: u64,
        expected_version: i64,
        reference_id: Option<&str>,
    ) -> RepositoryError {
        let existing = match reference_id {
            Some(reference_id) => self.find_by_reference(wallet_id, reference_id).await,
            None => Ok(None),
        };
        match existing {
            Ok(Some(existing)) => RepositoryError::DuplicateReference(Box::new(existing)),
            Ok(None) => RepositoryError::VersionConflict { wallet_id, expected_version },
            Err(e) => e,
        }
    }
}

#[async_trait]
impl WalletRepository for PgWalletRepository {
    async fn get_wallet(&self, owner_id: &str) -> Result<Option<Wallet>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM wallets WHERE owner_id = $1",
            WALLET_COLUMNS
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch wallet by owner")?;

        Ok(row.as_ref().map(Self::map_wallet))
    }

    async fn create_wallet(&self, owner_id: &str, currency: &str) -> Result<Wallet, RepositoryError> {
        let now = Utc::now();
        let result = sqlx::query(&format!(
            r#"
            INSERT INTO wallets (owner_id, balance, currency, version, created_at, updated_at)
            VALUES ($1, 0, $2, 0, $3, $3)
            RETURNING {}
            "#,
            WALLET_COLUMNS
        ))
        .bind(owner_id)
        .bind(currency)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(Self::map_wallet(&row)),
            // UNIQUE(owner_id) 위반 → 이미 지갑이 있음
            Err(e) if is_unique_violation(&e) => Err(RepositoryError::WalletAlreadyExists {
                owner_id: owner_id.to_string(),
            }),
            Err(e) => Err(anyhow::Error::new(e).context("Failed to create wallet").into()),
        }
    }

    async fn apply_mutation(
        &self,
        wallet_id: u64,
        expected_version: i64,
        delta: Decimal,
        transaction: NewTransaction,
    ) -> Result<(Wallet, Transaction), RepositoryError> {
        // 커밋 전에 반환하면 tx가 drop되면서 롤백된다
        let mut tx = self.pool.begin().await.context("Failed to begin wallet mutation")?;

        // 1. 멱등성 키 확인
        if let Some(reference_id) = transaction.reference_id.as_deref() {
            if let Some(existing) = Self::reference_in(&mut *tx, wallet_id, reference_id).await? {
                return Err(RepositoryError::DuplicateReference(Box::new(existing)));
            }
        }

        // 2. 버전/잔액 확인
        let new_balance = Self::checked_balance(&mut *tx, wallet_id, expected_version, delta).await?;

        // 3. 갱신 + 기록
        let now = Utc::now();
        let updated = Self::write_balance(&mut *tx, wallet_id, expected_version, new_balance, now).await?;

        let row = match Self::insert_transaction(&mut *tx, wallet_id, updated.balance, &transaction, now).await {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                drop(tx);
                return Err(self
                    .after_unique_violation(wallet_id, expected_version, transaction.reference_id.as_deref())
                    .await);
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context("Failed to insert wallet transaction").into());
            }
        };
        let recorded = Self::map_transaction(&row)?;

        tx.commit().await.context("Failed to commit wallet mutation")?;

        Ok((updated, recorded))
    }

    async fn apply_cancel(
        &self,
        wallet_id: u64,
        expected_version: i64,
        original_id: Uuid,
        transaction: NewTransaction,
    ) -> Result<(Wallet, Transaction), RepositoryError> {
        let mut tx = self.pool.begin().await.context("Failed to begin wallet cancel")?;

        // 1. cancel 자체의 멱등성 키
        if let Some(reference_id) = transaction.reference_id.as_deref() {
            if let Some(existing) = Self::reference_in(&mut *tx, wallet_id, reference_id).await? {
                return Err(RepositoryError::DuplicateReference(Box::new(existing)));
            }
        }

        // 2. 원본 상태
        let original = sqlx::query(&format!(
            "SELECT {} FROM wallet_transactions WHERE id = $1 AND wallet_id = $2",
            TRANSACTION_COLUMNS
        ))
        .bind(original_id)
        .bind(wallet_id as i64)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to load original transaction")?
        .ok_or_else(|| anyhow::anyhow!("Original transaction {} not found", original_id))?;
        let original = Self::map_transaction(&original)?;

        if original.status == TransactionStatus::Cancelled {
            let existing = sqlx::query(&format!(
                "SELECT {} FROM wallet_transactions WHERE ref_transaction_id = $1",
                TRANSACTION_COLUMNS
            ))
            .bind(original_id)
            .fetch_one(&mut *tx)
            .await
            .context("Failed to load cancel record")?;
            return Err(RepositoryError::AlreadyCancelled(Box::new(Self::map_transaction(&existing)?)));
        }
        if !original.is_cancellable() {
            return Err(RepositoryError::NotCancellable { transaction_id: original_id });
        }

        // 3. 반대 방향으로 버전/잔액 확인
        let new_balance =
            Self::checked_balance(&mut *tx, wallet_id, expected_version, original.reversal_delta()).await?;

        // 4. 갱신 + 원본 상태 변경 + cancel 기록
        let now = Utc::now();
        let updated = Self::write_balance(&mut *tx, wallet_id, expected_version, new_balance, now).await?;

        let flipped = sqlx::query(
            "UPDATE wallet_transactions SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4",
        )
        .bind(TransactionStatus::Cancelled.as_str())
        .bind(now)
        .bind(original_id)
        .bind(TransactionStatus::Completed.as_str())
        .execute(&mut *tx)
        .await
        .context("Failed to mark original transaction cancelled")?;
        if flipped.rows_affected() == 0 {
            return Err(RepositoryError::VersionConflict { wallet_id, expected_version });
        }

        let cancel = NewTransaction {
            transaction_type: TransactionType::Cancel,
            amount: original.amount,
            ref_transaction_id: Some(original_id),
            ..transaction
        };
        let row = match Self::insert_transaction(&mut *tx, wallet_id, updated.balance, &cancel, now).await {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e) => {
                drop(tx);
                return Err(self
                    .after_unique_violation(wallet_id, expected_version, cancel.reference_id.as_deref())
                    .await);
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context("Failed to insert cancel transaction").into());
            }
        };
        let recorded = Self::map_transaction(&row)?;

        tx.commit().await.context("Failed to commit wallet cancel")?;

        Ok((updated, recorded))
    }

    async fn find_by_reference(
        &self,
        wallet_id: u64,
        reference_id: &str,
    ) -> Result<Option<Transaction>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM wallet_transactions WHERE wallet_id = $1 AND reference_id = $2",
            TRANSACTION_COLUMNS
        ))
        .bind(wallet_id as i64)
        .bind(reference_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction by reference")?;

        row.as_ref().map(Self::map_transaction).transpose()
    }

    async fn list_transactions(
        &self,
        wallet_id: u64,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<Transaction>, u64), RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM wallet_transactions
            WHERE wallet_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(wallet_id as i64)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch transaction history")?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM wallet_transactions WHERE wallet_id = $1",
        )
        .bind(wallet_id as i64)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count transactions")?;

        let transactions = rows
            .iter()
            .map(Self::map_transaction)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((transactions, total as u64))
    }
}
