use std::time::Duration;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client;
use tracing::{debug, info};
use crate::domains::wallet::models::BalanceSnapshot;
use crate::shared::errors::CacheError;
use super::BalanceCache;

/// Redis 잔액 캐시
/// Redis-backed balance cache
///
/// 값은 BalanceSnapshot JSON (잔액은 문자열 decimal).
/// ConnectionManager가 끊어진 연결을 자동으로 다시 맺는다.
#[derive(Clone)]
pub struct RedisBalanceCache {
    manager: ConnectionManager,
}

impl RedisBalanceCache {
    /// Redis 연결
    /// Connect to Redis
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        info!(url = %url, "Connecting to Redis");

        let client = Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;

        info!("Redis connection established");
        Ok(Self { manager })
    }
}

#[async_trait]
impl BalanceCache for RedisBalanceCache {
    async fn get(&self, key: &str) -> Result<Option<BalanceSnapshot>, CacheError> {
        let mut conn = self.manager.clone();
        let raw = redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await?;

        match raw {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, snapshot: &BalanceSnapshot, ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(snapshot)?;
        let mut conn = self.manager.clone();

        // EX는 초 단위, 최소 1초
        redis::cmd("SET")
            .arg(key)
            .arg(payload)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<()>(&mut conn)
            .await?;

        debug!(key = %key, ttl_secs = ttl.as_secs(), "Balance cached");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn is_available(&self) -> bool {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
