use async_trait::async_trait;

use crate::errors::Result;

/// 缓存查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheResult {
    /// 命中，附带长链接
    Found(String),
    /// 未命中，需要回源存储
    Miss,
}

/// Best-effort mirror of `code → long URL` pairs.
///
/// The cache never decides whether a mapping is alive; that belongs to the
/// store. Implementations may evict, but must not invent entries.
#[async_trait]
pub trait UrlCache: Send + Sync {
    /// `Err` means the backend is unreachable; callers fall through to the store.
    async fn get(&self, code: &str) -> Result<CacheResult>;

    /// Upsert, no expiry of its own.
    async fn set(&self, code: &str, long_url: &str) -> Result<()>;

    /// Approximate entry count when the backend can tell cheaply.
    async fn len(&self) -> Option<u64> {
        None
    }

    fn backend_name(&self) -> &'static str;
}
