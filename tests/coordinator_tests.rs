//! LookupCoordinator tests
//!
//! Shorten / Resolve behavior over the in-memory store, plus one run
//! against SQLite to cover the write-behind path end to end.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;

use tinylinker::cache::{CacheResult, MokaUrlCache, NullUrlCache, UrlCache};
use tinylinker::errors::{Result, TinylinkError};
use tinylinker::services::{LinkPolicy, LookupCoordinator};
use tinylinker::shortcode::{DIGEST_LEN, Digest, Hasher, Md5Hasher};
use tinylinker::storage::{MappingStore, MemoryStore, SeaOrmStorage, StoreSettings, UrlMapping};

/// 所有输入都得到同一个摘要，用来制造碰撞
struct ConstantHasher;

impl Hasher for ConstantHasher {
    fn digest(&self, _long_url: &str) -> Digest {
        let mut digest = [0u8; DIGEST_LEN];
        for (i, byte) in digest.iter_mut().enumerate() {
            *byte = i as u8;
        }
        digest
    }
}

/// 每次调用都先等待一段时间的内存存储，用来放大并发窗口
struct SlowStore {
    inner: MemoryStore,
    delay: StdDuration,
}

impl SlowStore {
    fn new(delay: StdDuration) -> Self {
        Self {
            inner: MemoryStore::new(Duration::days(30)),
            delay,
        }
    }
}

#[async_trait]
impl MappingStore for SlowStore {
    async fn insert(&self, mapping: &UrlMapping) -> Result<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert(mapping).await
    }

    async fn find_by_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_code(code, now).await
    }

    async fn find_and_touch(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_and_touch(code, now).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.inner.purge_expired(now).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }

    fn retention(&self) -> Duration {
        self.inner.retention()
    }

    fn backend_name(&self) -> &str {
        "slow"
    }
}

/// `find_by_code` 永远看不到数据，模拟另一个实例抢先写入
struct BlindStore {
    inner: MemoryStore,
}

#[async_trait]
impl MappingStore for BlindStore {
    async fn insert(&self, mapping: &UrlMapping) -> Result<bool> {
        self.inner.insert(mapping).await
    }

    async fn find_by_code(&self, _code: &str, _now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        Ok(None)
    }

    async fn find_and_touch(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        self.inner.find_and_touch(code, now).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.inner.purge_expired(now).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }

    fn retention(&self) -> Duration {
        self.inner.retention()
    }

    fn backend_name(&self) -> &str {
        "blind"
    }
}

/// 读取正常、写入总是失败的存储
struct RejectingStore {
    inner: MemoryStore,
}

#[async_trait]
impl MappingStore for RejectingStore {
    async fn insert(&self, _mapping: &UrlMapping) -> Result<bool> {
        Err(TinylinkError::database_operation("disk full"))
    }

    async fn find_by_code(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        self.inner.find_by_code(code, now).await
    }

    async fn find_and_touch(&self, code: &str, now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        self.inner.find_and_touch(code, now).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        self.inner.purge_expired(now).await
    }

    async fn count(&self) -> Result<u64> {
        self.inner.count().await
    }

    fn retention(&self) -> Duration {
        self.inner.retention()
    }

    fn backend_name(&self) -> &str {
        "rejecting"
    }
}

/// 所有操作都不可达的存储
struct DownStore;

#[async_trait]
impl MappingStore for DownStore {
    async fn insert(&self, _mapping: &UrlMapping) -> Result<bool> {
        Err(TinylinkError::store_unavailable("connection refused"))
    }

    async fn find_by_code(&self, _code: &str, _now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        Err(TinylinkError::store_unavailable("connection refused"))
    }

    async fn find_and_touch(&self, _code: &str, _now: DateTime<Utc>) -> Result<Option<UrlMapping>> {
        Err(TinylinkError::store_unavailable("connection refused"))
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64> {
        Err(TinylinkError::store_unavailable("connection refused"))
    }

    async fn count(&self) -> Result<u64> {
        Err(TinylinkError::store_unavailable("connection refused"))
    }

    fn retention(&self) -> Duration {
        Duration::days(30)
    }

    fn backend_name(&self) -> &str {
        "down"
    }
}

/// 所有操作都报不可达的缓存
struct DownCache;

#[async_trait]
impl UrlCache for DownCache {
    async fn get(&self, _code: &str) -> Result<CacheResult> {
        Err(TinylinkError::cache_unavailable("redis timed out"))
    }

    async fn set(&self, _code: &str, _long_url: &str) -> Result<()> {
        Err(TinylinkError::cache_unavailable("redis timed out"))
    }

    fn backend_name(&self) -> &'static str {
        "down"
    }
}

fn policy() -> LinkPolicy {
    LinkPolicy {
        code_length: 6,
        durable_writes: false,
    }
}

fn memory_coordinator(
    hasher: Arc<dyn Hasher>,
    cache: Arc<dyn UrlCache>,
) -> (LookupCoordinator, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new(Duration::days(30)));
    let coordinator = LookupCoordinator::new(hasher, store.clone(), cache, policy());
    (coordinator, store)
}

#[tokio::test]
async fn test_round_trip() {
    let (coordinator, _store) =
        memory_coordinator(Arc::new(Md5Hasher), Arc::new(MokaUrlCache::new(1000)));

    let shortened = coordinator.shorten("https://example.com/a").await.unwrap();
    assert_eq!(shortened.code.len(), 6);
    assert_eq!(
        coordinator.resolve(&shortened.code).await.unwrap(),
        "https://example.com/a"
    );
}

#[tokio::test]
async fn test_round_trip_without_cache() {
    let (coordinator, _store) = memory_coordinator(Arc::new(Md5Hasher), Arc::new(NullUrlCache));

    let shortened = coordinator.shorten("https://example.com/b").await.unwrap();
    coordinator.flush_writes().await;
    assert_eq!(
        coordinator.resolve(&shortened.code).await.unwrap(),
        "https://example.com/b"
    );
}

#[tokio::test]
async fn test_idempotent_shorten() {
    let (coordinator, store) = memory_coordinator(Arc::new(Md5Hasher), Arc::new(NullUrlCache));

    let first = coordinator.shorten("https://example.com/a").await.unwrap();
    coordinator.flush_writes().await;
    let second = coordinator.shorten("https://example.com/a").await.unwrap();

    assert_eq!(first.code, second.code);
    assert!(first.created);
    assert!(!second.created);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_collisions_advance_the_window() {
    let (coordinator, _store) =
        memory_coordinator(Arc::new(ConstantHasher), Arc::new(NullUrlCache));

    let a = coordinator.shorten("https://one.example").await.unwrap();
    let b = coordinator.shorten("https://two.example").await.unwrap();
    let c = coordinator.shorten("https://three.example").await.unwrap();

    // "AAECAwQFBgcICQoLDA0ODw" 上依次滑动一个字符
    assert_eq!(a.code, "AAECAw");
    assert_eq!(b.code, "AECAwQ");
    assert_eq!(c.code, "ECAwQF");

    coordinator.flush_writes().await;
    assert_eq!(coordinator.resolve("AAECAw").await.unwrap(), "https://one.example");
    assert_eq!(coordinator.resolve("AECAwQ").await.unwrap(), "https://two.example");
    assert_eq!(coordinator.resolve("ECAwQF").await.unwrap(), "https://three.example");
}

#[tokio::test]
async fn test_allocation_exhausted_after_every_offset() {
    let (coordinator, _store) =
        memory_coordinator(Arc::new(ConstantHasher), Arc::new(NullUrlCache));

    // 22 字符编码，6 字符窗口 → 17 个偏移
    for i in 0..17 {
        coordinator
            .shorten(&format!("https://site{}.example", i))
            .await
            .unwrap();
    }

    let err = coordinator
        .shorten("https://one-too-many.example")
        .await
        .unwrap_err();
    assert!(matches!(err, TinylinkError::AllocationExhausted(_)));

    // 已有 URL 仍然能拿到自己的 code
    let again = coordinator.shorten("https://site0.example").await.unwrap();
    assert_eq!(again.code, "AAECAw");
}

#[tokio::test]
async fn test_resolve_unknown_code() {
    let (coordinator, _store) =
        memory_coordinator(Arc::new(Md5Hasher), Arc::new(MokaUrlCache::new(10)));
    let err = coordinator.resolve("zzzzzz").await.unwrap_err();
    assert!(matches!(err, TinylinkError::NotFound(_)));
}

#[tokio::test]
async fn test_expired_mapping_does_not_resolve() {
    let (coordinator, store) = memory_coordinator(Arc::new(Md5Hasher), Arc::new(NullUrlCache));
    store.put_raw(UrlMapping::new(
        "gone00",
        "https://gone.example",
        Utc::now() - Duration::days(31),
    ));

    let err = coordinator.resolve("gone00").await.unwrap_err();
    assert!(matches!(err, TinylinkError::NotFound(_)));
}

#[tokio::test]
async fn test_resolve_touches_mapping() {
    let (coordinator, store) = memory_coordinator(Arc::new(Md5Hasher), Arc::new(NullUrlCache));
    let old = Utc::now() - Duration::days(20);
    store.put_raw(UrlMapping::new("touch0", "https://touch.example", old));

    coordinator.resolve("touch0").await.unwrap();

    let row = store.raw("touch0").unwrap();
    assert!(row.updated_at > old + Duration::days(19));
    assert_eq!(row.created_at, old);
}

#[tokio::test]
async fn test_existing_mapping_reports_floating_expiry() {
    let (coordinator, store) = memory_coordinator(Arc::new(Md5Hasher), Arc::new(NullUrlCache));
    let first = coordinator.shorten("https://example.com/a").await.unwrap();
    coordinator.flush_writes().await;

    let last_touch = Utc::now() - Duration::days(10);
    let mut row = store.raw(&first.code).unwrap();
    row.updated_at = last_touch;
    store.put_raw(row);

    let again = coordinator.shorten("https://example.com/a").await.unwrap();
    assert_eq!(again.expire_on, last_touch + Duration::days(30));
}

#[tokio::test]
async fn test_shorten_sets_cache() {
    let cache = Arc::new(MokaUrlCache::new(100));
    let (coordinator, _store) = memory_coordinator(Arc::new(Md5Hasher), cache.clone());

    let shortened = coordinator.shorten("https://example.com/c").await.unwrap();
    assert_eq!(
        cache.get(&shortened.code).await.unwrap(),
        CacheResult::Found("https://example.com/c".to_string())
    );
}

#[tokio::test]
async fn test_concurrent_shorten_same_url_converges() {
    let (coordinator, store) = memory_coordinator(Arc::new(Md5Hasher), Arc::new(NullUrlCache));
    let coordinator = Arc::new(coordinator);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let coordinator = coordinator.clone();
        handles.push(tokio::spawn(async move {
            coordinator
                .shorten("https://example.com/race")
                .await
                .unwrap()
                .code
        }));
    }

    let mut codes = Vec::new();
    for handle in handles {
        codes.push(handle.await.unwrap());
    }
    coordinator.flush_writes().await;

    assert!(codes.iter().all(|c| c == &codes[0]));
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_write_behind_lands_in_sqlite() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_url = format!(
        "sqlite://{}?mode=rwc",
        temp_dir.path().join("coordinator.db").display()
    );
    let store: Arc<dyn MappingStore> = Arc::new(
        SeaOrmStorage::new(&db_url, "sqlite", StoreSettings::default())
            .await
            .expect("Failed to create storage"),
    );
    let coordinator = LookupCoordinator::new(
        Arc::new(Md5Hasher),
        store.clone(),
        Arc::new(NullUrlCache),
        policy(),
    );

    let shortened = coordinator.shorten("https://example.com/a").await.unwrap();
    assert_eq!(shortened.code, "zWm4Hq");
    coordinator.flush_writes().await;

    let row = store
        .find_by_code("zWm4Hq", Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.long_url, "https://example.com/a");
    assert_eq!(
        coordinator.resolve("zWm4Hq").await.unwrap(),
        "https://example.com/a"
    );
}

async fn race_two_urls(durable_writes: bool) {
    let store = Arc::new(SlowStore::new(StdDuration::from_millis(20)));
    let coordinator = LookupCoordinator::new(
        Arc::new(ConstantHasher),
        store,
        Arc::new(NullUrlCache),
        LinkPolicy {
            code_length: 6,
            durable_writes,
        },
    );

    let (a, b) = tokio::join!(
        coordinator.shorten("https://a.example"),
        coordinator.shorten("https://b.example")
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.code, b.code);

    coordinator.flush_writes().await;
    assert_eq!(coordinator.resolve(&a.code).await.unwrap(), "https://a.example");
    assert_eq!(coordinator.resolve(&b.code).await.unwrap(), "https://b.example");
}

#[tokio::test]
async fn test_concurrent_distinct_urls_get_distinct_codes_write_behind() {
    race_two_urls(false).await;
}

#[tokio::test]
async fn test_concurrent_distinct_urls_get_distinct_codes_durable() {
    race_two_urls(true).await;
}

#[tokio::test]
async fn test_durable_insert_conflict_moves_to_next_offset() {
    let store = Arc::new(BlindStore {
        inner: MemoryStore::new(Duration::days(30)),
    });
    let coordinator = LookupCoordinator::new(
        Arc::new(ConstantHasher),
        store,
        Arc::new(NullUrlCache),
        LinkPolicy {
            code_length: 6,
            durable_writes: true,
        },
    );

    let a = coordinator.shorten("https://a.example").await.unwrap();
    // 探测看不到 A 的行，只能靠插入结果发现冲突
    let b = coordinator.shorten("https://b.example").await.unwrap();

    assert_eq!(a.code, "AAECAw");
    assert_eq!(b.code, "AECAwQ");
    assert_eq!(coordinator.resolve("AAECAw").await.unwrap(), "https://a.example");
    assert_eq!(coordinator.resolve("AECAwQ").await.unwrap(), "https://b.example");
}

#[tokio::test]
async fn test_unavailable_cache_falls_through_to_store() {
    let (coordinator, store) = memory_coordinator(Arc::new(Md5Hasher), Arc::new(DownCache));

    let shortened = coordinator.shorten("https://example.com/a").await.unwrap();
    coordinator.flush_writes().await;
    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(
        coordinator.resolve(&shortened.code).await.unwrap(),
        "https://example.com/a"
    );
}

#[tokio::test]
async fn test_unavailable_store_surfaces_as_store_unavailable() {
    let coordinator = LookupCoordinator::new(
        Arc::new(Md5Hasher),
        Arc::new(DownStore),
        Arc::new(NullUrlCache),
        policy(),
    );

    let err = coordinator.resolve("zWm4Hq").await.unwrap_err();
    assert!(matches!(err, TinylinkError::StoreUnavailable(_)));
    assert!(err.is_retriable());

    let err = coordinator.shorten("https://example.com/a").await.unwrap_err();
    assert!(matches!(err, TinylinkError::StoreUnavailable(_)));
}

#[tokio::test]
async fn test_failed_background_insert_is_dropped() {
    let store = Arc::new(RejectingStore {
        inner: MemoryStore::new(Duration::days(30)),
    });
    let coordinator =
        LookupCoordinator::new(Arc::new(Md5Hasher), store, Arc::new(NullUrlCache), policy());

    // 调用方在写入确认之前已经拿到结果
    let shortened = coordinator.shorten("https://example.com/a").await.unwrap();
    assert!(shortened.created);

    coordinator.flush_writes().await;
    assert_eq!(coordinator.writer().pending(), 0);
    assert!(coordinator.writer().in_flight(&shortened.code).is_none());

    let err = coordinator.resolve(&shortened.code).await.unwrap_err();
    assert!(matches!(err, TinylinkError::NotFound(_)));
}

#[tokio::test]
async fn test_failed_durable_insert_is_reported() {
    let store = Arc::new(RejectingStore {
        inner: MemoryStore::new(Duration::days(30)),
    });
    let coordinator = LookupCoordinator::new(
        Arc::new(Md5Hasher),
        store,
        Arc::new(NullUrlCache),
        LinkPolicy {
            code_length: 6,
            durable_writes: true,
        },
    );

    let err = coordinator.shorten("https://example.com/a").await.unwrap_err();
    assert!(matches!(err, TinylinkError::StoreUnavailable(_)));
    assert!(coordinator.writer().in_flight("zWm4Hq").is_none());
}
