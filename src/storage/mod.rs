use std::sync::Arc;

use crate::config::StaticConfig;
use crate::errors::Result;

pub mod backend;
pub mod expiry;
pub mod memory;
pub mod models;
pub mod traits;

pub use backend::{SeaOrmStorage, StoreSettings};
pub use expiry::ExpirySweeper;
pub use memory::MemoryStore;
pub use models::UrlMapping;
pub use traits::MappingStore;

pub struct StorageFactory;

impl StorageFactory {
    /// 根据 database_url 创建存储后端
    pub async fn create(config: &StaticConfig) -> Result<Arc<dyn MappingStore>> {
        let database_url = &config.database.database_url;
        let settings = StoreSettings::from_config(config);

        // 从 URL 自动推断数据库类型
        let backend_type = backend::infer_backend_from_url(database_url)?;

        if backend_type == "memory" {
            tracing::warn!("Using in-memory store, mappings will not survive a restart");
            return Ok(Arc::new(MemoryStore::new(settings.retention)));
        }

        let storage = SeaOrmStorage::new(database_url, &backend_type, settings).await?;
        Ok(Arc::new(storage))
    }
}
