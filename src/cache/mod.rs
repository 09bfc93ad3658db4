use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{CacheConfig, CacheType};
use crate::errors::Result;

pub mod memory;
pub mod null;
pub mod redis;
pub mod traits;

pub use memory::MokaUrlCache;
pub use null::NullUrlCache;
pub use self::redis::RedisUrlCache;
pub use traits::{CacheResult, UrlCache};

pub struct CacheFactory;

impl CacheFactory {
    /// 根据 cache.type 创建缓存后端
    pub async fn create(config: &CacheConfig) -> Result<Arc<dyn UrlCache>> {
        let cache: Arc<dyn UrlCache> = match config.cache_type {
            CacheType::Memory => Arc::new(MokaUrlCache::new(config.memory.max_capacity)),
            CacheType::Redis => Arc::new(
                RedisUrlCache::connect(
                    &config.redis.url,
                    &config.redis.key_prefix,
                    Duration::from_millis(config.timeout_ms.max(1)),
                )
                .await?,
            ),
            CacheType::None => Arc::new(NullUrlCache),
        };

        info!("Cache backend: {}", cache.backend_name());
        Ok(cache)
    }
}
