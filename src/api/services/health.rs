use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, trace};

use crate::services::LookupCoordinator;

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct HealthStorageCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mappings_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthCacheCheck {
    pub status: String,
    pub cache_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub storage: HealthStorageCheck,
    pub cache: HealthCacheCheck,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub uptime: u64,
    pub pending_writes: usize,
    pub checks: HealthChecks,
    pub response_time_ms: u64,
}

/// Health Service
///
/// 直接访问存储与缓存，不经过 Shorten/Resolve 逻辑（k8s probes 要求快速响应）
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        coordinator: web::Data<Arc<LookupCoordinator>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let store = coordinator.store();
        let backend = store.backend_name().to_string();

        // 检查存储健康状况（只查 count）
        let storage_status = match tokio::time::timeout(Duration::from_secs(5), store.count()).await
        {
            Ok(Ok(count)) => {
                trace!("Storage health check passed, {} mappings found", count);
                HealthStorageCheck {
                    status: "healthy".to_string(),
                    backend,
                    mappings_count: Some(count),
                    error: None,
                }
            }
            Ok(Err(e)) => {
                error!("Storage health check failed: {}", e);
                HealthStorageCheck {
                    status: "unhealthy".to_string(),
                    backend,
                    mappings_count: None,
                    error: Some(format!("database error: {}", e)),
                }
            }
            Err(_) => {
                error!("Storage health check timeout");
                HealthStorageCheck {
                    status: "unhealthy".to_string(),
                    backend,
                    mappings_count: None,
                    error: Some("timeout".to_string()),
                }
            }
        };

        // 缓存不可用只算降级，不影响整体状态
        let cache = coordinator.cache();
        let entries = cache.len().await;
        let cache_status = HealthCacheCheck {
            status: if entries.is_some() || cache.backend_name() == "none" {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            cache_type: cache.backend_name().to_string(),
            entries,
        };

        let now = chrono::Utc::now();
        let uptime_seconds = (now - app_start_time.start_datetime).num_seconds().max(0) as u64;
        let is_healthy = storage_status.status == "healthy";

        let health_response = HealthResponse {
            status: if is_healthy {
                "healthy".to_string()
            } else {
                "unhealthy".to_string()
            },
            timestamp: now.to_rfc3339(),
            uptime: uptime_seconds,
            pending_writes: coordinator.writer().pending(),
            checks: HealthChecks {
                storage: storage_status,
                cache: cache_status,
            },
            response_time_ms: start_time.elapsed().as_millis() as u64,
        };

        let response_status = if is_healthy {
            actix_web::http::StatusCode::OK
        } else {
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE
        };

        info!(
            "Health check completed in {:?}, status: {}, uptime: {}s",
            start_time.elapsed(),
            health_response.status,
            uptime_seconds
        );

        HttpResponse::build(response_status)
            .append_header(("Content-Type", "application/json; charset=utf-8"))
            .json(health_response)
    }

    // 简单的就绪检查，只返回 200 状态码
    pub async fn readiness_check() -> impl Responder {
        trace!("Received readiness check request");

        HttpResponse::Ok()
            .append_header(("Content-Type", "text/plain"))
            .body("OK")
    }

    // 活跃性检查，检查基本服务可用性
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");

        HttpResponse::NoContent().finish()
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/ready", web::get().to(HealthService::readiness_check))
        .route("/ready", web::head().to(HealthService::readiness_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}
