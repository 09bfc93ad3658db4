use async_trait::async_trait;
use moka::future::Cache;
use tracing::{debug, trace};

use crate::cache::{CacheResult, UrlCache};
use crate::errors::Result;

/// 进程内有界缓存
///
/// 只按容量淘汰，不设 TTL：过期由存储层负责。
pub struct MokaUrlCache {
    inner: Cache<String, String>,
}

impl MokaUrlCache {
    pub fn new(max_capacity: u64) -> Self {
        let inner = Cache::builder().max_capacity(max_capacity).build();
        debug!("MokaUrlCache initialized with max capacity: {}", max_capacity);
        Self { inner }
    }

    /// 立即执行挂起的淘汰任务（测试时用于得到准确的 entry_count）
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn get(&self, code: &str) -> Result<CacheResult> {
        match self.inner.get(code).await {
            Some(long_url) => {
                trace!("Memory cache hit: {}", code);
                Ok(CacheResult::Found(long_url))
            }
            None => {
                trace!("Memory cache miss: {}", code);
                Ok(CacheResult::Miss)
            }
        }
    }

    async fn set(&self, code: &str, long_url: &str) -> Result<()> {
        self.inner
            .insert(code.to_string(), long_url.to_string())
            .await;
        Ok(())
    }

    async fn len(&self) -> Option<u64> {
        Some(self.inner.entry_count())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
