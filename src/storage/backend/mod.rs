//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod connection;
mod converters;
mod mutations;
mod query;
pub mod retry;

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use tracing::{error, warn};

use crate::config::StaticConfig;
use crate::errors::{Result, TinylinkError};
use crate::storage::{MappingStore, UrlMapping};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{mapping_to_active_model, model_to_mapping};
pub use retry::{RetryConfig, RetryError};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("memory://") {
        Ok("memory".to_string())
    } else if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(TinylinkError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://, memory://",
            database_url
        )))
    }
}

/// 规范化 backend 名称
pub fn normalize_backend_name(backend: &str) -> String {
    match backend {
        "mariadb" => "mysql".to_string(),
        other => other.to_string(),
    }
}

/// Knobs shared by every store backend
#[derive(Clone, Copy, Debug)]
pub struct StoreSettings {
    pub retention: Duration,
    pub pool_size: u32,
    pub retry: RetryConfig,
}

impl StoreSettings {
    pub fn from_config(config: &StaticConfig) -> Self {
        let timeout = StdDuration::from_secs(config.database.timeout.max(1));
        Self {
            retention: Duration::seconds(config.link.retention_secs as i64),
            pool_size: config.database.pool_size,
            retry: RetryConfig {
                max_retries: config.database.retry_count,
                base_delay_ms: config.database.retry_base_delay_ms,
                max_delay_ms: config.database.retry_max_delay_ms,
                attempt_timeout: timeout,
            },
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::from_config(&StaticConfig::default())
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retention: Duration,
    retry_config: RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(
        database_url: &str,
        backend_name: &str,
        settings: StoreSettings,
    ) -> Result<Self> {
        if database_url.is_empty() {
            return Err(TinylinkError::database_config("DATABASE_URL 未设置"));
        }

        let backend_name = normalize_backend_name(backend_name);
        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(
                database_url,
                &backend_name,
                settings.pool_size,
                settings.retry.attempt_timeout,
            )
            .await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name,
            retention: settings.retention,
            retry_config: settings.retry,
        };

        run_migrations(&storage.db).await?;

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    /// 将重试层的失败转换为业务错误
    fn map_failure(operation: &str, err: RetryError) -> TinylinkError {
        match err {
            RetryError::TimedOut { .. } | RetryError::Exhausted(_) => {
                error!("Store operation '{}' unavailable: {}", operation, err);
                TinylinkError::store_unavailable(format!("{}: {}", operation, err))
            }
            RetryError::Fatal(e) => {
                error!("Store operation '{}' failed: {}", operation, e);
                TinylinkError::database_operation(format!("{}: {}", operation, e))
            }
        }
    }
}

#[async_trait]
impl MappingStore for SeaOrmStorage {
    async fn insert(&self, mapping: &UrlMapping) -> Result<bool> {
        self.insert_mapping(mapping).await
    }

    async fn find_by_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        self.find_live(code, now).await
    }

    async fn find_and_touch(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UrlMapping>> {
        self.touch_live(code, now).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.delete_expired(now).await
    }

    async fn count(&self) -> Result<u64> {
        self.count_rows().await
    }

    fn retention(&self) -> Duration {
        self.retention
    }

    fn backend_name(&self) -> &str {
        &self.backend_name
    }
}
