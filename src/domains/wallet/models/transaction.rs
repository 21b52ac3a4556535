use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use std::fmt;
use std::str::FromStr;

// =====================================================
// Transaction 모델
// =====================================================
// 역할: 잔액을 변경한 사건 1건의 추가 전용(append-only) 기록
//
// - amount는 항상 양수, 방향은 transaction_type이 결정
// - balance_after는 적용 직후의 잔액 스냅샷 (감사/재생 검증용)
// - (wallet_id, reference_id)는 reference_id가 있을 때 최대 1건만 존재
// - cancel 기록은 ref_transaction_id로 원본을 가리키며, 원본당 최대 1건
// =====================================================

/// 트랜잭션 종류
/// Transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Bet,
    Win,
    Bonus,
    Refund,
    /// 이전 트랜잭션 취소 (방향은 원본의 반대)
    Cancel,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Bet => "bet",
            TransactionType::Win => "win",
            TransactionType::Bonus => "bonus",
            TransactionType::Refund => "refund",
            TransactionType::Cancel => "cancel",
        }
    }

    /// 잔액을 늘리는 종류인지 (입금/당첨/보너스/환불)
    /// Whether this type credits the wallet
    pub fn is_credit(&self) -> bool {
        matches!(
            self,
            TransactionType::Deposit
                | TransactionType::Win
                | TransactionType::Bonus
                | TransactionType::Refund
        )
    }

    /// 양수 금액을 부호 있는 잔액 변화량으로 변환
    /// Convert a positive amount into the signed balance delta
    ///
    /// Cancel의 방향은 원본이 정하므로 `Transaction::reversal_delta`를 쓴다.
    pub fn signed_delta(&self, amount: Decimal) -> Decimal {
        if self.is_credit() { amount } else { -amount }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            "bet" => Ok(TransactionType::Bet),
            "win" => Ok(TransactionType::Win),
            "bonus" => Ok(TransactionType::Bonus),
            "refund" => Ok(TransactionType::Refund),
            "cancel" => Ok(TransactionType::Cancel),
            other => Err(anyhow::anyhow!("Unknown transaction type: {}", other)),
        }
    }
}

/// 트랜잭션 상태
/// Transaction status
///
/// 모든 변경은 같은 작업 안에서 completed로 확정된다.
/// 취소된 원본은 cancelled로 바뀐다. pending은 비동기 정산용으로 예약된 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            "cancelled" => Ok(TransactionStatus::Cancelled),
            other => Err(anyhow::anyhow!("Unknown transaction status: {}", other)),
        }
    }
}

/// 저장된 트랜잭션 레코드
/// Persisted transaction record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(as = WalletTransaction)]
pub struct Transaction {
    pub id: Uuid,
    pub wallet_id: u64,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,

    /// Positive magnitude of the movement
    /// 변동 금액 (항상 양수)
    #[schema(value_type = String, example = "100.00")]
    pub amount: Decimal,

    /// Wallet balance immediately after this transaction
    /// 적용 직후 잔액
    #[schema(value_type = String, example = "1100.00")]
    pub balance_after: Decimal,

    pub currency: String,

    /// Caller-supplied idempotency key
    /// 멱등성 키 (호출자 제공)
    pub reference_id: Option<String>,

    pub game_id: Option<String>,
    pub description: Option<String>,

    /// Transaction this cancel reverses
    /// 취소 대상 원본 트랜잭션 ID (cancel 기록에만 존재)
    pub ref_transaction_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// 취소할 수 있는 기록인지 (완료된 일반 트랜잭션만)
    /// Whether this record can still be cancelled
    pub fn is_cancellable(&self) -> bool {
        self.status == TransactionStatus::Completed && self.transaction_type != TransactionType::Cancel
    }

    /// 이 트랜잭션을 되돌리는 잔액 변화량
    /// Balance delta that reverses this transaction
    pub fn reversal_delta(&self) -> Decimal {
        -self.transaction_type.signed_delta(self.amount)
    }
}

/// Repository에 넘기는 트랜잭션 봉투 (balance_after/status는 저장 시 결정)
/// Transaction envelope handed to the repository; balance_after and status
/// are decided at commit time.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub id: Uuid,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub currency: String,
    pub reference_id: Option<String>,
    pub game_id: Option<String>,
    pub description: Option<String>,
    pub ref_transaction_id: Option<Uuid>,
}

// =====================================================
// 서비스 입출력 모델
// =====================================================

/// 잔액 변경 요청 (입금, 출금, 베팅, 당첨 등)
/// Balance mutation request
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(as = MutationRequest)]
pub struct MutationRequest {
    #[serde(skip)]
    pub owner_id: String,

    #[schema(value_type = String, example = "100.00")]
    pub amount: Decimal,

    pub transaction_type: TransactionType,

    /// Idempotency key; resending the same key never applies twice
    /// 멱등성 키
    #[schema(example = "tx-42")]
    pub reference_id: Option<String>,

    pub game_id: Option<String>,
    pub description: Option<String>,

    /// 지정하면 지갑 통화와 같아야 함
    pub currency: Option<String>,
}

impl MutationRequest {
    pub fn new(owner_id: impl Into<String>, amount: Decimal, transaction_type: TransactionType) -> Self {
        Self {
            owner_id: owner_id.into(),
            amount,
            transaction_type,
            reference_id: None,
            game_id: None,
            description: None,
            currency: None,
        }
    }

    pub fn with_reference(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn with_game(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = Some(game_id.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }
}

/// 트랜잭션 취소 요청
/// Cancel request: reverses a completed transaction
///
/// reference_id는 취소 자체의 멱등성 키, original_reference_id는 원본의 키.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(as = CancelRequest)]
pub struct CancelRequest {
    #[serde(skip)]
    pub owner_id: String,

    #[schema(example = "cancel-42")]
    pub reference_id: String,

    #[schema(example = "tx-42")]
    pub original_reference_id: String,

    pub description: Option<String>,
}

impl CancelRequest {
    pub fn new(
        owner_id: impl Into<String>,
        reference_id: impl Into<String>,
        original_reference_id: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            reference_id: reference_id.into(),
            original_reference_id: original_reference_id.into(),
            description: None,
        }
    }
}

/// 잔액 변경 결과
/// Outcome of an applied (or reconciled) mutation
///
/// 같은 reference로 재요청하면 기록된 결과가 그대로 반환된다.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[schema(as = TransactionOutcome)]
pub struct TransactionOutcome {
    pub transaction_id: Uuid,
    pub owner_id: String,
    pub transaction_type: TransactionType,

    #[schema(value_type = String)]
    pub amount: Decimal,

    /// Balance right after the transaction (balance_after)
    #[schema(value_type = String)]
    pub balance: Decimal,

    pub currency: String,
    pub reference_id: Option<String>,

    /// 취소 결과일 때 원본 트랜잭션 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_transaction_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
}

impl TransactionOutcome {
    pub fn from_record(owner_id: &str, transaction: &Transaction) -> Self {
        Self {
            transaction_id: transaction.id,
            owner_id: owner_id.to_string(),
            transaction_type: transaction.transaction_type,
            amount: transaction.amount,
            balance: transaction.balance_after,
            currency: transaction.currency.clone(),
            reference_id: transaction.reference_id.clone(),
            ref_transaction_id: transaction.ref_transaction_id,
            created_at: transaction.created_at,
        }
    }
}

/// 거래 내역 조회 결과
/// Transaction history page
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = TransactionHistory)]
pub struct TransactionHistory {
    pub owner_id: String,
    pub transactions: Vec<Transaction>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// 거래 내역 조회 파라미터
/// History query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// 1..=100, 기본 10
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
