use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

// =====================================================
// Wallet 모델
// =====================================================
// 역할: 플레이어 1명당 1개의 잔액 레코드
//
// 불변식:
// - balance >= 0 (음수 잔액 불가)
// - version은 커밋된 잔액 변경마다 정확히 1씩 증가 (낙관적 동시성 토큰)
// - currency는 생성 후 변경 불가
// =====================================================

/// 지갑 정보 (데이터베이스에서 조회한 지갑)
/// Wallet information (as stored in the persistent store)
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[schema(as = Wallet)]
pub struct Wallet {
    /// Wallet ID (BIGSERIAL, auto-generated)
    /// 지갑 ID (DB에서 자동 생성)
    pub id: u64,

    /// Owner account ID (1:1 with wallet)
    /// 소유자 계정 ID
    #[schema(example = "player-1001")]
    pub owner_id: String,

    /// Current balance (fixed-point decimal)
    /// 현재 잔액 (고정소수점)
    #[schema(value_type = String, example = "1000.00")]
    pub balance: Decimal,

    /// ISO 4217 style currency code, immutable
    /// 통화 코드 (생성 후 변경 불가)
    #[schema(example = "KRW")]
    pub currency: String,

    /// Optimistic concurrency token
    /// 낙관적 동시성 버전
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 금액/잔액 컬럼(NUMERIC(20, 4))의 소수 자릿수
/// Fractional digits the money columns keep
pub const MONEY_SCALE: u32 = 4;

/// 금액/잔액 상한 (9999999999999999.9999)
/// Largest amount or balance the money columns can hold
pub fn max_money() -> Decimal {
    Decimal::from_i128_with_scale(99_999_999_999_999_999_999, MONEY_SCALE)
}

/// 거래 금액 검증: 0보다 크고, 소수 4자리 이하, 상한 이하
/// Validate a movement amount against the money column range
///
/// 뒤쪽 0은 무시한다 ("1.50000"은 허용).
pub fn is_valid_amount(amount: Decimal) -> bool {
    amount > Decimal::ZERO
        && amount.normalize().scale() <= MONEY_SCALE
        && amount <= max_money()
}

/// 통화 코드 검증 (영문 대문자 3자리)
/// Validate currency code (three ASCII uppercase letters)
pub fn is_valid_currency(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

// =====================================================
// 요청/응답 모델 (API 경계)
// =====================================================

/// 지갑 생성 요청
/// Create wallet request
#[derive(Debug, Deserialize, ToSchema)]
#[schema(as = CreateWalletRequest)]
pub struct CreateWalletRequest {
    #[schema(example = "KRW")]
    pub currency: String,
}

/// 지갑 생성 응답
/// Create wallet response
#[derive(Debug, Serialize, ToSchema)]
#[schema(as = CreateWalletResponse)]
pub struct CreateWalletResponse {
    pub wallet: Wallet,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_validation() {
        assert!(is_valid_currency("KRW"));
        assert!(is_valid_currency("USD"));
        assert!(!is_valid_currency("krw"));
        assert!(!is_valid_currency("KR"));
        assert!(!is_valid_currency("KRWW"));
        assert!(!is_valid_currency("K1W"));
        assert!(!is_valid_currency(""));
    }

    #[test]
    fn test_amount_validation() {
        assert!(is_valid_amount(dec!(0.0001)));
        assert!(is_valid_amount(dec!(1.50000)));
        assert!(is_valid_amount(max_money()));

        assert!(!is_valid_amount(Decimal::ZERO));
        assert!(!is_valid_amount(dec!(-1)));
        assert!(!is_valid_amount(dec!(0.00001)));
        assert!(!is_valid_amount(dec!(10000000000000000)));
    }
}
