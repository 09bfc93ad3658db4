use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, trace};

use crate::errors::Result;
use crate::storage::{MappingStore, UrlMapping};

/// In-process store backed by a `DashMap`.
///
/// Nothing survives a restart. Selected with a `memory://` database URL and
/// used heavily by tests.
pub struct MemoryStore {
    rows: DashMap<String, UrlMapping>,
    retention: Duration,
}

impl MemoryStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            rows: DashMap::new(),
            retention,
        }
    }

    /// 直接读取原始行（包括已过期但未清理的）
    pub fn raw(&self, code: &str) -> Option<UrlMapping> {
        self.rows.get(code).map(|row| row.clone())
    }

    /// 直接写入原始行，绕过插入语义（测试用：构造过期数据）
    pub fn put_raw(&self, mapping: UrlMapping) {
        self.rows.insert(mapping.code.clone(), mapping);
    }
}

#[async_trait]
impl MappingStore for MemoryStore {
    async fn insert(&self, mapping: &UrlMapping) -> Result<bool> {
        let now = Utc::now();
        let written = match self.rows.entry(mapping.code.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now, self.retention) {
                    debug!(
                        "Insert for code '{}' ignored, a live mapping already exists",
                        mapping.code
                    );
                    false
                } else {
                    occupied.insert(mapping.clone());
                    trace!("Replaced expired mapping for code '{}'", mapping.code);
                    true
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(mapping.clone());
                trace!("Inserted mapping for code '{}'", mapping.code);
                true
            }
        };
        Ok(written)
    }

    async fn find_by_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        Ok(self
            .rows
            .get(code)
            .filter(|row| row.is_live(now, self.retention))
            .map(|row| row.clone()))
    }

    async fn find_and_touch(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UrlMapping>> {
        match self.rows.get_mut(code) {
            Some(mut row) if row.is_live(now, self.retention) => {
                row.touch(now);
                Ok(Some(row.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let cutoff = now - self.retention;
        let mut removed = 0u64;
        self.rows.retain(|_, row| {
            let keep = row.updated_at >= cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }

    fn retention(&self) -> Duration {
        self.retention
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
