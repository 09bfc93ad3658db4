use async_trait::async_trait;
use tracing::trace;

use crate::cache::{CacheResult, UrlCache};
use crate::errors::Result;

/// Cache that never holds anything; every read goes to the store.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullUrlCache;

#[async_trait]
impl UrlCache for NullUrlCache {
    async fn get(&self, code: &str) -> Result<CacheResult> {
        trace!("NullUrlCache miss for {}", code);
        Ok(CacheResult::Miss)
    }

    async fn set(&self, _code: &str, _long_url: &str) -> Result<()> {
        Ok(())
    }

    async fn len(&self) -> Option<u64> {
        Some(0)
    }

    fn backend_name(&self) -> &'static str {
        "none"
    }
}
