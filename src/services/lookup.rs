//! Shorten / resolve orchestration
//!
//! Shorten: hash → allocate against the store (plus codes still in flight)
//! → reserve the code → insert (write-behind or durable) → cache set.
//! Losing a code to another writer resumes probing at the next offset.
//! Resolve: cache → store find-and-touch → cache backfill.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::cache::{CacheResult, UrlCache};
use crate::errors::{Result, TinylinkError};
use crate::services::write_behind::{Reservation, WriteBehind};
use crate::shortcode::{Allocation, CodeAllocator, CodeLookup, Hasher};
use crate::storage::{MappingStore, UrlMapping};

/// 短码策略
#[derive(Debug, Clone, Copy)]
pub struct LinkPolicy {
    pub code_length: usize,
    /// true: Shorten 等待写入完成后才返回
    pub durable_writes: bool,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            code_length: 6,
            durable_writes: false,
        }
    }
}

/// Result of a successful Shorten
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortened {
    pub code: String,
    pub long_url: String,
    pub expire_on: DateTime<Utc>,
    /// false when the long URL already owned a live code
    pub created: bool,
}

impl Shortened {
    fn from_mapping(mapping: UrlMapping, retention: Duration, created: bool) -> Self {
        Self {
            expire_on: mapping.expires_at(retention),
            code: mapping.code,
            long_url: mapping.long_url,
            created,
        }
    }
}

/// Store probe that also sees codes reserved by inserts not yet written.
struct PendingAwareLookup<'a> {
    writer: &'a WriteBehind,
    store: &'a dyn MappingStore,
}

#[async_trait]
impl<'a> CodeLookup for PendingAwareLookup<'a> {
    async fn lookup(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        if let Some(pending) = self.writer.in_flight(code) {
            trace!("Code '{}' is held by an in-flight insert", code);
            return Ok(Some(pending));
        }
        self.store.find_by_code(code, now).await
    }
}

pub struct LookupCoordinator {
    hasher: Arc<dyn Hasher>,
    store: Arc<dyn MappingStore>,
    cache: Arc<dyn UrlCache>,
    allocator: CodeAllocator,
    writer: WriteBehind,
    policy: LinkPolicy,
}

impl LookupCoordinator {
    pub fn new(
        hasher: Arc<dyn Hasher>,
        store: Arc<dyn MappingStore>,
        cache: Arc<dyn UrlCache>,
        policy: LinkPolicy,
    ) -> Self {
        info!(
            "LookupCoordinator ready (store: {}, cache: {}, code length: {}, durable writes: {})",
            store.backend_name(),
            cache.backend_name(),
            policy.code_length,
            policy.durable_writes
        );
        Self {
            hasher,
            writer: WriteBehind::new(Arc::clone(&store)),
            store,
            cache,
            allocator: CodeAllocator::new(policy.code_length),
            policy,
        }
    }

    pub async fn shorten(&self, long_url: &str) -> Result<Shortened> {
        if long_url.is_empty() {
            return Err(TinylinkError::missing_parameter(
                "URL parameter longUrl is missing",
            ));
        }

        let now = Utc::now();
        let retention = self.store.retention();
        let digest = self.hasher.digest(long_url);
        let probe = PendingAwareLookup {
            writer: &self.writer,
            store: self.store.as_ref(),
        };

        let mut start = 0;
        let shortened = loop {
            let allocation = self
                .allocator
                .allocate_from(long_url, &digest, &probe, now, start)
                .await
                .map_err(|e| match e {
                    TinylinkError::AllocationExhausted(_) => {
                        warn!("No free code for '{}': {}", long_url, e);
                        e
                    }
                    other => Self::store_failure("allocating", long_url, other),
                })?;

            let (code, offset) = match allocation {
                Allocation::Existing(mapping) => {
                    debug!("'{}' already shortened as {}", long_url, mapping.code);
                    break Shortened::from_mapping(mapping, retention, false);
                }
                Allocation::Vacant { code, offset } => (code, offset),
            };

            let mapping = UrlMapping::new(code, long_url, now);
            match self.writer.reserve(&mapping) {
                Reservation::Reserved => {}
                Reservation::Held(holder) if holder.long_url == long_url => {
                    debug!("'{}' is being shortened concurrently as {}", long_url, holder.code);
                    break Shortened::from_mapping(holder, retention, false);
                }
                Reservation::Held(_) => {
                    debug!(
                        "Code '{}' claimed by a concurrent Shorten, probing from offset {}",
                        mapping.code,
                        offset + 1
                    );
                    start = offset + 1;
                    continue;
                }
            }

            if self.policy.durable_writes {
                let written = self
                    .writer
                    .write_now(&mapping)
                    .await
                    .map_err(|e| Self::store_failure("inserting", long_url, e))?;
                if !written {
                    // 其他写入者先落盘了这个 code
                    let holder = self
                        .store
                        .find_by_code(&mapping.code, now)
                        .await
                        .map_err(|e| Self::store_failure("re-reading", long_url, e))?;
                    match holder {
                        Some(holder) if holder.long_url == long_url => {
                            break Shortened::from_mapping(holder, retention, false);
                        }
                        _ => {
                            debug!("Lost code '{}' to another writer", mapping.code);
                            start = offset + 1;
                            continue;
                        }
                    }
                }
            } else {
                self.writer.dispatch(mapping.clone());
            }

            debug!("Shortened '{}' -> {}", long_url, mapping.code);
            break Shortened::from_mapping(mapping, retention, true);
        };

        if let Err(e) = self.cache.set(&shortened.code, long_url).await {
            warn!("Cache set for '{}' failed: {}", shortened.code, e);
        }

        Ok(shortened)
    }

    pub async fn resolve(&self, code: &str) -> Result<String> {
        if code.is_empty() {
            return Err(TinylinkError::not_found("empty code"));
        }

        match self.cache.get(code).await {
            Ok(CacheResult::Found(long_url)) => return Ok(long_url),
            Ok(CacheResult::Miss) => {}
            Err(e) => warn!("Cache get for '{}' failed, falling back to store: {}", code, e),
        }

        let now = Utc::now();
        let found = self.store.find_and_touch(code, now).await.map_err(|e| {
            error!("Store lookup for '{}' failed: {}", code, e);
            TinylinkError::store_unavailable(e.message())
        })?;

        let long_url = match found {
            Some(mapping) => mapping.long_url,
            None => match self.writer.in_flight(code) {
                Some(pending) => pending.long_url,
                None => {
                    trace!("No live mapping for '{}'", code);
                    return Err(TinylinkError::not_found(format!("no mapping for '{}'", code)));
                }
            },
        };

        if let Err(e) = self.cache.set(code, &long_url).await {
            warn!("Cache backfill for '{}' failed: {}", code, e);
        }
        Ok(long_url)
    }

    fn store_failure(stage: &str, long_url: &str, err: TinylinkError) -> TinylinkError {
        error!("Store unreachable while {} for '{}': {}", stage, long_url, err);
        TinylinkError::store_unavailable(err.message())
    }

    /// 等待所有后台写入落盘
    pub async fn flush_writes(&self) {
        self.writer.flush().await;
    }

    pub fn writer(&self) -> &WriteBehind {
        &self.writer
    }

    pub fn store(&self) -> &Arc<dyn MappingStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<dyn UrlCache> {
        &self.cache
    }

    pub fn policy(&self) -> LinkPolicy {
        self.policy
    }
}
