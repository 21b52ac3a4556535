use std::time::Duration;
use async_trait::async_trait;
use crate::domains::wallet::models::BalanceSnapshot;
use crate::shared::errors::CacheError;
use super::BalanceCache;

/// 캐시 비활성화 (항상 miss, 쓰기는 무시)
/// No-op cache; every read goes to the store
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledBalanceCache;

#[async_trait]
impl BalanceCache for DisabledBalanceCache {
    async fn get(&self, _key: &str) -> Result<Option<BalanceSnapshot>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _snapshot: &BalanceSnapshot, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }

    async fn is_available(&self) -> bool {
        false
    }

    fn backend(&self) -> &'static str {
        "disabled"
    }
}
