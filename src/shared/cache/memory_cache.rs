// =====================================================
// InMemoryBalanceCache - DashMap 기반 잔액 캐시
// =====================================================
// 역할: Redis 없이 TTL 의미를 그대로 갖는 프로세스 내부 캐시
//
// - 만료된 항목은 조회 시점에 제거 (lazy expiry)
// - 다시 읽히지 않는 키는 set SWEEP_EVERY번마다 전체 정리
// - set_available(false)로 장애 상황을 흉내낼 수 있다
//   (모든 연산이 Unavailable 에러)
// =====================================================

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use async_trait::async_trait;
use dashmap::DashMap;
use crate::domains::wallet::models::BalanceSnapshot;
use crate::shared::errors::CacheError;
use super::BalanceCache;

/// set 몇 번마다 만료 항목을 전체 정리할지
const SWEEP_EVERY: u64 = 256;

struct Entry {
    snapshot: BalanceSnapshot,
    expires_at: Instant,
}

/// 메모리 잔액 캐시
/// In-process balance cache with TTL
pub struct InMemoryBalanceCache {
    entries: DashMap<String, Entry>,
    available: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
}

impl Default for InMemoryBalanceCache {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            available: AtomicBool::new(true),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
        }
    }
}

impl InMemoryBalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 장애 주입: false면 모든 연산이 실패한다
    /// Toggle availability to simulate an outage
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// 만료되지 않은 항목이 있는지 (통계에 영향 없음)
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.expires_at > Instant::now())
            .unwrap_or(false)
    }

    /// 저장된 항목 수 (만료됐지만 아직 정리되지 않은 항목 포함)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 만료 항목 전체 정리, 제거한 개수 반환
    /// Drop every expired entry
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    fn ensure_available(&self) -> Result<(), CacheError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable("in-memory cache marked unavailable".to_string()))
        }
    }
}

#[async_trait]
impl BalanceCache for InMemoryBalanceCache {
    async fn get(&self, key: &str) -> Result<Option<BalanceSnapshot>, CacheError> {
        self.ensure_available()?;

        let now = Instant::now();
        let found = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.snapshot.clone()),
            _ => None,
        };

        match found {
            Some(snapshot) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(snapshot))
            }
            None => {
                // 만료 항목 정리 (읽기 guard가 해제된 뒤)
                self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, snapshot: &BalanceSnapshot, ttl: Duration) -> Result<(), CacheError> {
        self.ensure_available()?;
        self.entries.insert(
            key.to_string(),
            Entry {
                snapshot: snapshot.clone(),
                expires_at: Instant::now() + ttl,
            },
        );

        if self.sets.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.purge_expired();
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.ensure_available()?;
        self.entries.remove(key);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
