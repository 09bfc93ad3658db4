use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheFactory;
use crate::config::StaticConfig;
use crate::services::{LinkPolicy, LookupCoordinator};
use crate::shortcode::Md5Hasher;
use crate::storage::{ExpirySweeper, MappingStore, StorageFactory};

pub struct StartupContext {
    pub store: Arc<dyn MappingStore>,
    pub coordinator: Arc<LookupCoordinator>,
    pub sweeper: ExpirySweeper,
}

impl StartupContext {
    /// 启动后台过期清理任务（仅服务器模式需要）
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        self.sweeper.clone().spawn()
    }
}

/// 安装 rustls 加密后端，重复安装视为成功
fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// 构建存储、缓存与 LookupCoordinator
///
/// 所有依赖都在这里显式创建并注入，不使用全局单例。
pub async fn prepare_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    install_crypto_provider();

    let store = StorageFactory::create(config)
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", store.backend_name());

    let cache = CacheFactory::create(&config.cache)
        .await
        .context("Failed to create cache backend")?;

    let coordinator = Arc::new(LookupCoordinator::new(
        Arc::new(Md5Hasher),
        Arc::clone(&store),
        cache,
        LinkPolicy {
            code_length: config.link.code_length,
            durable_writes: config.link.durable_writes,
        },
    ));

    let sweeper = ExpirySweeper::new(
        Arc::clone(&store),
        Duration::from_secs(config.link.sweep_interval_secs),
    );

    info!("Pre-startup completed in {:?}", start_time.elapsed());

    Ok(StartupContext {
        store,
        coordinator,
        sweeper,
    })
}
