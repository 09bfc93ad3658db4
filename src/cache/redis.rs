use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::sync::RwLock;
use tracing::{debug, error, trace};

use crate::cache::{CacheResult, UrlCache};
use crate::errors::{Result, TinylinkError};

/// 所有映射存放在同一个 Redis hash 中（HGET / HSET）
const HASH_NAME: &str = "urls";

pub struct RedisUrlCache {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    hash_key: String,
    timeout: Duration,
}

impl RedisUrlCache {
    /// 建立客户端并 PING 一次，确认服务器可达
    pub async fn connect(url: &str, key_prefix: &str, timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            TinylinkError::cache_unavailable(format!("Invalid Redis URL '{}': {}", url, e))
        })?;

        let cache = Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            hash_key: format!("{}{}", key_prefix, HASH_NAME),
            timeout,
        };

        let pong: String = cache
            .bounded("PING", |mut conn| async move {
                redis::cmd("PING").query_async::<String>(&mut conn).await
            })
            .await?;
        debug!(
            "RedisUrlCache connected ({}), hash key '{}'",
            pong, cache.hash_key
        );

        Ok(cache)
    }

    /// 获取或建立持久连接
    async fn get_connection(&self) -> std::result::Result<MultiplexedConnection, redis::RedisError> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        // 双重检查，避免竞态条件
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");

        Ok(new_conn)
    }

    /// 重置连接（在连接错误时调用）
    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Redis connection reset due to error");
    }

    /// 在时间预算内执行一个命令；失败或超时都会丢弃连接
    async fn bounded<T, F, Fut>(&self, what: &str, command: F) -> Result<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let outcome = tokio::time::timeout(self.timeout, async {
            let conn = self.get_connection().await?;
            command(conn).await
        })
        .await;

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!("Redis {} failed: {}", what, e);
                self.reset_connection().await;
                Err(e.into())
            }
            Err(_) => {
                error!("Redis {} timed out after {:?}", what, self.timeout);
                self.reset_connection().await;
                Err(TinylinkError::cache_unavailable(format!(
                    "Redis {} timed out after {:?}",
                    what, self.timeout
                )))
            }
        }
    }
}

#[async_trait]
impl UrlCache for RedisUrlCache {
    async fn get(&self, code: &str) -> Result<CacheResult> {
        let hash_key = self.hash_key.clone();
        let field = code.to_string();

        let value: Option<String> = self
            .bounded("HGET", |mut conn| async move { conn.hget(hash_key, field).await })
            .await?;

        match value {
            Some(long_url) if !long_url.is_empty() => {
                trace!("Redis cache hit: {}", code);
                Ok(CacheResult::Found(long_url))
            }
            _ => {
                trace!("Redis cache miss: {}", code);
                Ok(CacheResult::Miss)
            }
        }
    }

    async fn set(&self, code: &str, long_url: &str) -> Result<()> {
        let hash_key = self.hash_key.clone();
        let field = code.to_string();
        let value = long_url.to_string();

        self.bounded("HSET", |mut conn| async move {
            let _: i64 = conn.hset(hash_key, field, value).await?;
            Ok(())
        })
        .await?;

        trace!("Cached {} in Redis hash", code);
        Ok(())
    }

    async fn len(&self) -> Option<u64> {
        let hash_key = self.hash_key.clone();
        self.bounded("HLEN", |mut conn| async move { conn.hlen(hash_key).await })
            .await
            .ok()
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
