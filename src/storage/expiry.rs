//! 过期清理任务
//!
//! 周期性删除超过保留期未被访问的映射，防止存储无限增长。
//! 读取路径本身已经过滤过期行，所以清理只影响空间占用，不影响可见性。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::errors::Result;
use crate::storage::MappingStore;

#[derive(Clone)]
pub struct ExpirySweeper {
    store: Arc<dyn MappingStore>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn MappingStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// 执行一次清理，返回删除数量
    pub async fn sweep_once(&self) -> Result<u64> {
        let removed = self.store.purge_expired(Utc::now()).await?;
        debug!(
            "Expiry sweep on {} backend removed {} mappings",
            self.store.backend_name(),
            removed
        );
        Ok(removed)
    }

    /// 启动后台清理循环
    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            "Expiry sweeper started (interval {:?}, retention {}s)",
            self.interval,
            self.store.retention().num_seconds()
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep_once().await {
                    // 下一轮继续，不退出循环
                    error!("Expiry sweep failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, UrlMapping};
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_sweep_once_removes_only_stale_rows() {
        let store = Arc::new(MemoryStore::new(ChronoDuration::days(30)));
        let now = Utc::now();
        store.put_raw(UrlMapping::new("stale1", "https://a", now - ChronoDuration::days(45)));
        store.put_raw(UrlMapping::new("fresh1", "https://b", now - ChronoDuration::days(1)));

        let sweeper = ExpirySweeper::new(store.clone(), Duration::from_secs(60));
        assert_eq!(sweeper.sweep_once().await.unwrap(), 1);
        assert!(store.raw("stale1").is_none());
        assert!(store.raw("fresh1").is_some());
    }

    #[tokio::test]
    async fn test_spawned_sweeper_runs_immediately() {
        let store = Arc::new(MemoryStore::new(ChronoDuration::days(30)));
        store.put_raw(UrlMapping::new(
            "stale1",
            "https://a",
            Utc::now() - ChronoDuration::days(31),
        ));

        let handle = ExpirySweeper::new(store.clone(), Duration::from_secs(3600)).spawn();
        // 第一次 tick 立即触发
        for _ in 0..50 {
            if store.raw("stale1").is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert!(store.raw("stale1").is_none());
    }
}
