//! 数据库操作重试模块
//!
//! 每次尝试都有独立的超时；可重试错误按指数退避 + 抖动重试，
//! 重试耗尽后返回错误，调用方不会无限期挂起。

use sea_orm::DbErr;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// 重试配置
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// 单次尝试的时间预算
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

/// 重试耗尽后的失败原因
#[derive(Debug)]
pub enum RetryError {
    /// 最后一次尝试超时
    TimedOut { operation: String, after: Duration },
    /// 可重试错误，重试耗尽
    Exhausted(DbErr),
    /// 不可重试错误，未重试
    Fatal(DbErr),
}

impl std::fmt::Display for RetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryError::TimedOut { operation, after } => {
                write!(f, "operation '{}' timed out after {:?}", operation, after)
            }
            RetryError::Exhausted(e) => write!(f, "retries exhausted: {}", e),
            RetryError::Fatal(e) => write!(f, "{}", e),
        }
    }
}

/// 判断数据库错误是否可重试
pub fn is_retryable_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(runtime_err) | DbErr::Query(runtime_err) => {
            is_retryable_runtime_error(runtime_err)
        }
        _ => false,
    }
}

/// 死锁、锁超时、SQLite BUSY 等可重试
fn is_retryable_runtime_error(err: &sea_orm::error::RuntimeErr) -> bool {
    use sea_orm::error::RuntimeErr;

    match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            use std::ops::Deref;
            if let Some(db_err) = sqlx_err.deref().as_database_error()
                && let Some(code) = db_err.code()
            {
                return matches!(
                    code.as_ref(),
                    // MySQL 死锁和锁超时
                    "1213" | "1205" |
                    // PostgreSQL 序列化失败和死锁
                    "40001" | "40P01" |
                    // SQLite BUSY 和 LOCKED
                    "5" | "6"
                );
            }
            is_retryable_error_message(&sqlx_err.to_string().to_lowercase())
        }
        RuntimeErr::Internal(msg) => is_retryable_error_message(&msg.to_lowercase()),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

fn is_retryable_error_message(err_str: &str) -> bool {
    err_str.contains("deadlock")
        || err_str.contains("lock wait timeout")
        || err_str.contains("database is locked")
        || err_str.contains("serialization failure")
        || err_str.contains("connection reset")
        || err_str.contains("broken pipe")
}

/// 计算指数退避延迟（带 0-25% 抖动）
fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    let exp_delay = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    let capped = exp_delay.min(max_ms);
    let jitter = rand::random_range(0..=capped / 4);
    capped.saturating_add(jitter)
}

/// 带超时的重试执行器
pub async fn with_retry_timeout<T, F, Fut>(
    operation_name: &str,
    config: RetryConfig,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut attempt = 0;
    loop {
        let outcome = tokio::time::timeout(config.attempt_timeout, operation()).await;

        let failure = match outcome {
            Ok(Ok(value)) => {
                if attempt > 0 {
                    debug!(
                        "Operation '{}' succeeded after {} retries",
                        operation_name, attempt
                    );
                }
                return Ok(value);
            }
            Ok(Err(e)) if !is_retryable_error(&e) => {
                debug!(
                    "Operation '{}' failed with non-retryable error: {}",
                    operation_name, e
                );
                return Err(RetryError::Fatal(e));
            }
            Ok(Err(e)) => {
                if attempt >= config.max_retries {
                    return Err(RetryError::Exhausted(e));
                }
                e.to_string()
            }
            Err(_elapsed) => {
                if attempt >= config.max_retries {
                    warn!(
                        "Operation '{}' timed out after {:?}, retries exhausted",
                        operation_name, config.attempt_timeout
                    );
                    return Err(RetryError::TimedOut {
                        operation: operation_name.to_string(),
                        after: config.attempt_timeout,
                    });
                }
                format!("timed out after {:?}", config.attempt_timeout)
            }
        };

        attempt += 1;
        let delay = calculate_backoff(attempt, config.base_delay_ms, config.max_delay_ms);
        warn!(
            "Operation '{}' failed (attempt {}/{}): {}; retrying in {} ms",
            operation_name,
            attempt,
            config.max_retries + 1,
            failure,
            delay
        );
        sleep(Duration::from_millis(delay)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            base_delay_ms: 5,
            max_delay_ms: 20,
            attempt_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_is_retryable_error_connection_acquire() {
        let err = DbErr::ConnectionAcquire(sea_orm::error::ConnAcquireErr::Timeout);
        assert!(is_retryable_error(&err));
    }

    #[test]
    fn test_is_retryable_error_record_not_found() {
        let err = DbErr::RecordNotFound("not found".to_string());
        assert!(!is_retryable_error(&err));
    }

    #[test]
    fn test_is_retryable_error_database_locked() {
        let err = DbErr::Query(sea_orm::error::RuntimeErr::Internal(
            "database is locked".to_string(),
        ));
        assert!(is_retryable_error(&err));
    }

    #[test]
    fn test_calculate_backoff_bounds() {
        let first = calculate_backoff(1, 100, 2000);
        assert!((100..=125).contains(&first));

        let third = calculate_backoff(3, 100, 2000);
        assert!((400..=500).contains(&third));

        let capped = calculate_backoff(10, 100, 2000);
        assert!((2000..=2500).contains(&capped));
    }

    #[tokio::test]
    async fn test_success_after_retries() {
        let calls = AtomicU32::new(0);

        let result = with_retry_timeout("test_op", fast_config(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DbErr::ConnectionAcquire(
                        sea_orm::error::ConnAcquireErr::Timeout,
                    ))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries() {
        let calls = AtomicU32::new(0);

        let result = with_retry_timeout("test_op", fast_config(2), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<i32, _>(DbErr::ConnectionAcquire(
                    sea_orm::error::ConnAcquireErr::Timeout,
                ))
            }
        })
        .await;

        assert!(matches!(result, Err(RetryError::Exhausted(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result = with_retry_timeout("test_op", fast_config(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, _>(DbErr::RecordNotFound("gone".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(RetryError::Fatal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hanging_operation_times_out() {
        let calls = AtomicU32::new(0);

        let result = with_retry_timeout("hang", fast_config(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<i32, DbErr>(1)
            }
        })
        .await;

        assert!(matches!(result, Err(RetryError::TimedOut { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
