use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use tracing::{error, trace, warn};

use crate::errors::TinylinkError;
use crate::services::LookupCoordinator;

pub const MISSING_LONG_URL: &str = "URL parameter longUrl is missing";
pub const MISSING_TINY_URL: &str = "URL parameter tinyUrl is missing";
pub const LONG_URL_NOT_FOUND: &str = "Unable to find long URL";
pub const ALLOCATION_FAILED: &str = "Unable to generate tiny URL";
pub const SERVICE_UNAVAILABLE: &str = "Service temporarily unavailable";

#[derive(Debug, Deserialize)]
pub struct TinyQuery {
    #[serde(rename = "longUrl")]
    pub long_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LongQuery {
    #[serde(rename = "tinyUrl")]
    pub tiny_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TinyResponse {
    pub url: String,
    #[serde(rename = "expireOn")]
    pub expire_on: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LongResponse {
    pub url: String,
}

pub struct TinyService;

impl TinyService {
    /// GET /tiny/?longUrl=
    ///
    /// 存储不可用时返回 503：调用方没有拿到任何 code，应当稍后重试。
    pub async fn shorten(
        query: web::Query<TinyQuery>,
        coordinator: web::Data<Arc<LookupCoordinator>>,
    ) -> impl Responder {
        let long_url = match query.into_inner().long_url {
            Some(url) if !url.is_empty() => url,
            _ => return Self::text(StatusCode::OK, MISSING_LONG_URL),
        };

        match coordinator.shorten(&long_url).await {
            Ok(shortened) => {
                trace!("Shortened {} -> {}", long_url, shortened.code);
                HttpResponse::Ok().json(TinyResponse {
                    url: shortened.code,
                    expire_on: shortened
                        .expire_on
                        .to_rfc3339_opts(SecondsFormat::Secs, true),
                })
            }
            Err(TinylinkError::MissingParameter(_)) => Self::text(StatusCode::OK, MISSING_LONG_URL),
            Err(TinylinkError::AllocationExhausted(msg)) => {
                warn!("Shorten gave up for {}: {}", long_url, msg);
                Self::text(StatusCode::OK, ALLOCATION_FAILED)
            }
            Err(e) if e.is_retriable() => {
                error!("Shorten failed for {}: {}", long_url, e);
                Self::text(StatusCode::SERVICE_UNAVAILABLE, SERVICE_UNAVAILABLE)
            }
            Err(e) => {
                error!("Shorten failed for {}: {}", long_url, e);
                Self::text(StatusCode::INTERNAL_SERVER_ERROR, ALLOCATION_FAILED)
            }
        }
    }

    /// GET /long/?tinyUrl=
    ///
    /// 存储故障对调用方表现为“未找到”（200），与旧客户端的约定一致；故障只在日志中区分。
    pub async fn resolve(
        query: web::Query<LongQuery>,
        coordinator: web::Data<Arc<LookupCoordinator>>,
    ) -> impl Responder {
        let code = match query.into_inner().tiny_url {
            Some(code) if !code.is_empty() => code,
            _ => return Self::text(StatusCode::OK, MISSING_TINY_URL),
        };

        match coordinator.resolve(&code).await {
            Ok(long_url) => HttpResponse::Ok().json(LongResponse { url: long_url }),
            Err(TinylinkError::NotFound(_)) => {
                trace!("No long URL for {}", code);
                Self::text(StatusCode::OK, LONG_URL_NOT_FOUND)
            }
            Err(e) => {
                if e.is_retriable() {
                    error!("Resolve for {} hit an unavailable store: {}", code, e);
                } else {
                    error!("Resolve failed for {}: {}", code, e);
                }
                Self::text(StatusCode::OK, LONG_URL_NOT_FOUND)
            }
        }
    }

    #[inline]
    fn text(status: StatusCode, body: &'static str) -> HttpResponse {
        HttpResponse::build(status)
            .insert_header(("Content-Type", "text/plain; charset=utf-8"))
            .body(body)
    }
}

/// 短链接路由，带或不带末尾斜杠都可访问
pub fn tiny_routes() -> actix_web::Scope {
    web::scope("")
        .route("/tiny", web::get().to(TinyService::shorten))
        .route("/tiny/", web::get().to(TinyService::shorten))
        .route("/long", web::get().to(TinyService::resolve))
        .route("/long/", web::get().to(TinyService::resolve))
}
