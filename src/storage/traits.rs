use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::errors::Result;
use crate::storage::UrlMapping;

/// Authoritative storage for code → long URL mappings.
///
/// The store owns the expiry policy: any mapping whose `updated_at` is older
/// than [`MappingStore::retention`] is treated as absent by every read and is
/// physically removed by [`MappingStore::purge_expired`].
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Insert a new mapping. Returns `false` when nothing was written.
    ///
    /// A live row already holding the same code wins and the insert becomes a
    /// no-op; an expired row with the same code is replaced.
    async fn insert(&self, mapping: &UrlMapping) -> Result<bool>;

    async fn find_by_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>>;

    /// Read a live mapping and refresh its `updated_at` to `now` in one step.
    async fn find_and_touch(&self, code: &str, now: DateTime<Utc>)
    -> Result<Option<UrlMapping>>;

    /// Delete every mapping untouched for longer than the retention window.
    /// Returns the number of removed rows.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Number of stored rows, live or not yet swept.
    async fn count(&self) -> Result<u64>;

    fn retention(&self) -> Duration;

    fn backend_name(&self) -> &str;
}
