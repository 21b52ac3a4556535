use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use crate::domains::wallet::models::Wallet;

/// 캐시에 저장되는 잔액 스냅샷
/// Balance snapshot held by the cache (derived, expendable)
///
/// Decimal은 문자열로 직렬화된다 (rust_decimal serde-with-str).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(as = BalanceSnapshot)]
pub struct BalanceSnapshot {
    pub owner_id: String,

    #[schema(value_type = String, example = "1000.00")]
    pub balance: Decimal,

    pub currency: String,
    pub last_updated: DateTime<Utc>,
}

impl From<&Wallet> for BalanceSnapshot {
    fn from(wallet: &Wallet) -> Self {
        Self {
            owner_id: wallet.owner_id.clone(),
            balance: wallet.balance,
            currency: wallet.currency.clone(),
            last_updated: wallet.updated_at,
        }
    }
}

/// 잔액 조회 응답
/// Balance response
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = WalletBalanceResponse)]
pub struct WalletBalanceResponse {
    pub owner_id: String,

    #[schema(value_type = String, example = "1000.00")]
    pub balance: Decimal,

    pub currency: String,
    pub last_updated: DateTime<Utc>,

    /// 캐시에서 응답했는지 여부
    pub cache_hit: bool,
}

impl WalletBalanceResponse {
    pub fn new(snapshot: BalanceSnapshot, cache_hit: bool) -> Self {
        Self {
            owner_id: snapshot.owner_id,
            balance: snapshot.balance,
            currency: snapshot.currency,
            last_updated: snapshot.last_updated,
            cache_hit,
        }
    }
}
