use std::time::Duration;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::services::LookupCoordinator;

/// 等待后台写入的最长时间（秒）
const FLUSH_TIMEOUT_SECS: u64 = 10;

/// 等待 Ctrl+C
pub async fn listen_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, flushing pending writes...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }
}

/// 刷新后台写入并停止过期清理任务
pub async fn perform_shutdown_tasks(coordinator: &LookupCoordinator, sweeper: JoinHandle<()>) {
    let pending = coordinator.writer().pending();
    if coordinator
        .writer()
        .flush_timeout(Duration::from_secs(FLUSH_TIMEOUT_SECS))
        .await
    {
        info!("Flushed {} pending writes", pending);
    } else {
        error!(
            "Write flush timed out after {} seconds, {} mappings may be lost",
            FLUSH_TIMEOUT_SECS,
            coordinator.writer().pending()
        );
    }

    sweeper.abort();
    info!("Expiry sweeper stopped");
}
