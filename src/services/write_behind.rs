//! Background insert dispatcher
//!
//! Shorten answers before the mapping is durable. A code is first claimed
//! with [`WriteBehind::reserve`]; the claim stays visible through
//! [`WriteBehind::in_flight`] until the insert ends, so concurrent allocations
//! on this instance never hand the same code to a different URL. Every insert
//! handed to [`WriteBehind::dispatch`] runs on its own tokio task.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Notify;
use tracing::{debug, error, trace, warn};

use crate::errors::Result;
use crate::storage::{MappingStore, UrlMapping};

/// Outcome of claiming a code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    Reserved,
    /// Another in-flight insert already holds the code.
    Held(UrlMapping),
}

#[derive(Clone)]
pub struct WriteBehind {
    store: Arc<dyn MappingStore>,
    in_flight: Arc<DashMap<String, UrlMapping>>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl WriteBehind {
    pub fn new(store: Arc<dyn MappingStore>) -> Self {
        Self {
            store,
            in_flight: Arc::new(DashMap::new()),
            pending: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// 原子地占用 code；同一 code 已被其他写入占用时返回占用者
    pub fn reserve(&self, mapping: &UrlMapping) -> Reservation {
        match self.in_flight.entry(mapping.code.clone()) {
            Entry::Occupied(held) => Reservation::Held(held.get().clone()),
            Entry::Vacant(vacant) => {
                vacant.insert(mapping.clone());
                Reservation::Reserved
            }
        }
    }

    /// 释放本映射持有的占用（不会误删其他 URL 的占用）
    pub fn release(&self, mapping: &UrlMapping) {
        self.in_flight
            .remove_if(&mapping.code, |_, held| held.long_url == mapping.long_url);
    }

    /// 后台写入，失败只记录日志
    pub fn dispatch(&self, mapping: UrlMapping) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.in_flight
            .entry(mapping.code.clone())
            .or_insert_with(|| mapping.clone());

        let store = Arc::clone(&self.store);
        let in_flight = Arc::clone(&self.in_flight);
        let pending = Arc::clone(&self.pending);
        let idle = Arc::clone(&self.idle);

        tokio::spawn(async move {
            match store.insert(&mapping).await {
                Ok(true) => trace!("Background insert finished: {}", mapping.code),
                Ok(false) => warn!(
                    "Background insert for '{}' lost the code to another writer, mapping dropped",
                    mapping.code
                ),
                Err(e) => error!(
                    "Background insert for '{}' failed, mapping dropped: {}",
                    mapping.code, e
                ),
            }

            in_flight.remove_if(&mapping.code, |_, held| held.long_url == mapping.long_url);
            if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                idle.notify_waiters();
            }
        });
    }

    /// 同步写入（durable_writes 模式），结束后释放占用。
    /// 返回 `false` 表示 code 已被其他写入者持有。
    pub async fn write_now(&self, mapping: &UrlMapping) -> Result<bool> {
        let written = self.store.insert(mapping).await;
        self.release(mapping);
        written
    }

    /// A mapping accepted by `dispatch` whose insert has not completed yet.
    pub fn in_flight(&self, code: &str) -> Option<UrlMapping> {
        self.in_flight.get(code).map(|entry| entry.value().clone())
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// 等待所有已派发的写入结束
    pub async fn flush(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // 先登记等待，再检查计数，避免错过通知
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            debug!("Waiting for {} background inserts", self.pending());
            notified.await;
        }
    }

    /// Returns `false` if writes were still outstanding when the budget ran out.
    pub async fn flush_timeout(&self, budget: Duration) -> bool {
        match tokio::time::timeout(budget, self.flush()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    "{} background inserts still pending after {:?}",
                    self.pending(),
                    budget
                );
                false
            }
        }
    }
}
