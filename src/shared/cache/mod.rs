// =====================================================
// Balance Cache
// =====================================================
// 역할: 지갑 잔액 스냅샷을 짧은 TTL로 보관하는 cache-aside 저장소
//
// 구현체:
// - RedisBalanceCache: Redis (운영)
// - InMemoryBalanceCache: DashMap (테스트/단일 노드)
// - DisabledBalanceCache: 항상 miss (캐시 없이 운영)
//
// 캐시는 권위 있는 저장소가 아니다. 모든 에러는 서비스에서 흡수된다.
// =====================================================

pub mod redis_cache;
pub mod memory_cache;
pub mod disabled_cache;

pub use redis_cache::RedisBalanceCache;
pub use memory_cache::InMemoryBalanceCache;
pub use disabled_cache::DisabledBalanceCache;

use std::time::Duration;
use async_trait::async_trait;
use crate::domains::wallet::models::BalanceSnapshot;
use crate::shared::errors::CacheError;

/// 잔액 캐시 인터페이스
/// Balance cache interface
#[async_trait]
pub trait BalanceCache: Send + Sync {
    /// 캐시된 스냅샷 조회. 없거나 만료되면 None.
    async fn get(&self, key: &str) -> Result<Option<BalanceSnapshot>, CacheError>;

    /// 스냅샷 저장 (ttl 후 만료)
    async fn set(&self, key: &str, snapshot: &BalanceSnapshot, ttl: Duration) -> Result<(), CacheError>;

    /// 항목 삭제. 없는 키 삭제도 성공.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// 캐시가 현재 응답 가능한지
    /// Whether the cache is reachable right now
    async fn is_available(&self) -> bool;

    /// 로그용 백엔드 이름
    fn backend(&self) -> &'static str;
}

/// 지갑 잔액 캐시 키: `{prefix}wallet:{owner_id}:balance`
pub fn balance_key(prefix: &str, owner_id: &str) -> String {
    format!("{}wallet:{}:balance", prefix, owner_id)
}
