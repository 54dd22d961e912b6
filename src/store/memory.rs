//! In-process store backends on moka.
//!
//! Records and quotas live in [`moka`] caches: records with per-entry
//! expiration driven by each record's own deadline (via moka's
//! [`Expiry`] policy), quotas with a fixed time-to-live equal to the
//! reset period, so a spent allowance comes back by eviction alone.
//!
//! Version-checked record updates are serialized through a striped lock
//! so the compare-and-swap in [`RecordStore::update`] is atomic per
//! key without a global write lock.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use tokio::sync::Mutex;

use crate::config::{CachingSettings, QuotaSettings};
use crate::store::{ApiKeyStore, QuotaStore, RecordStore, VersionedRecord, compression};
use crate::telemetry;
use crate::types::{ApiKey, DisposableCounter, ExpirationDate, Quota, Record};
use crate::Result;

const LOCK_STRIPES: usize = 64;

/// Persisted record layout: body bytes (possibly gzip-compressed) plus
/// the lifecycle fields, the absolute deadline, and the store version.
#[derive(Debug, Clone)]
struct StoredRecord {
    body: Vec<u8>,
    clicks: u32,
    countdown: u8,
    eternal: bool,
    url: bool,
    expires_at: Option<SystemTime>,
    version: u64,
}

impl StoredRecord {
    /// Remaining lifetime; `None` means never expire.
    fn ttl(&self) -> Option<Duration> {
        self.expires_at.map(|deadline| {
            deadline
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO)
        })
    }
}

/// Per-entry expiration from each record's own deadline.
struct RecordExpiry;

impl Expiry<String, Arc<StoredRecord>> for RecordExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<StoredRecord>,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl()
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Arc<StoredRecord>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl()
    }
}

/// In-process [`RecordStore`] with transparent body compression.
pub struct MemoryRecordStore {
    cache: Cache<String, Arc<StoredRecord>>,
    locks: Vec<Mutex<()>>,
    compress_threshold: u64,
    max_body_bytes: u64,
}

impl MemoryRecordStore {
    /// `max_body_bytes` bounds decompression output (bomb guard); use
    /// the privileged maximum body size.
    pub fn new(caching: &CachingSettings, max_body_bytes: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(caching.max_entries)
            .expire_after(RecordExpiry)
            .build();
        Self {
            cache,
            locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
            compress_threshold: caching.compress_threshold_bytes,
            max_body_bytes,
        }
    }

    fn stripe(&self, key: &str) -> &Mutex<()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.locks[(hasher.finish() as usize) % LOCK_STRIPES]
    }

    fn to_stored(&self, record: &Record, version: u64) -> Result<StoredRecord> {
        let raw = record.raw_body();
        let body = if raw.len() as u64 > self.compress_threshold {
            metrics::counter!(telemetry::COMPRESSED_BODIES_TOTAL).increment(1);
            compression::compress(raw)?
        } else {
            raw.to_vec()
        };

        Ok(StoredRecord {
            body,
            clicks: record.clicks(),
            countdown: record.counter().remaining(),
            eternal: record.counter().is_eternal(),
            url: record.is_url(),
            expires_at: record.expiration().deadline(),
            version,
        })
    }

    fn to_record(&self, stored: &StoredRecord) -> Result<Record> {
        let body = if compression::is_compressed(&stored.body) {
            compression::decompress(&stored.body, self.max_body_bytes)?
        } else {
            stored.body.clone()
        };

        Ok(Record::from_parts(
            body,
            ExpirationDate::from_deadline(stored.expires_at),
            DisposableCounter::new(stored.countdown, stored.eternal),
            stored.clicks,
            stored.url,
        ))
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.cache.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<VersionedRecord>> {
        let Some(stored) = self.cache.get(key).await else {
            return Ok(None);
        };
        let record = self.to_record(&stored)?;
        Ok(Some(VersionedRecord {
            record,
            version: stored.version,
        }))
    }

    async fn put(&self, key: &str, record: &Record) -> Result<()> {
        let stored = self.to_stored(record, 0)?;
        let _guard = self.stripe(key).lock().await;
        self.cache.insert(key.to_string(), Arc::new(stored)).await;
        Ok(())
    }

    async fn update(&self, key: &str, record: &Record, expected_version: u64) -> Result<bool> {
        let _guard = self.stripe(key).lock().await;

        let Some(current) = self.cache.get(key).await else {
            return Ok(false);
        };
        if current.version != expected_version {
            return Ok(false);
        }

        let stored = self.to_stored(record, expected_version + 1)?;
        self.cache.insert(key.to_string(), Arc::new(stored)).await;
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}

/// In-process [`QuotaStore`].
///
/// Each entry is a shared [`Quota`] whose atomic counter is the
/// synchronization point for concurrent decrements; the moka TTL
/// (the reset period, measured from creation) retires spent entries.
pub struct MemoryQuotaStore {
    cache: Cache<String, Arc<Quota>>,
    default: i64,
}

impl MemoryQuotaStore {
    /// Fails when the configured default allowance is below 1.
    pub fn new(settings: &QuotaSettings) -> Result<Self> {
        // Validate once here so lazy creation below can't fail.
        Quota::new(settings.quota)?;
        let cache = Cache::builder()
            .time_to_live(settings.reset_period())
            .build();
        Ok(Self {
            cache,
            default: settings.quota,
        })
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn decrement(&self, source_ip: &str) -> Result<i64> {
        let default = self.default;
        let entry = self
            .cache
            .entry(source_ip.to_string())
            .or_insert_with(async move { Arc::new(Quota::unchecked(default)) })
            .await;
        Ok(entry.into_value().sub())
    }

    async fn get(&self, source_ip: &str) -> Result<Option<i64>> {
        Ok(self.cache.get(source_ip).await.map(|quota| quota.value()))
    }
}

/// In-process [`ApiKeyStore`].
///
/// Credentials are loaded by the embedding application (issuance is an
/// administrative flow); the cache core only reads them. The map is
/// behind a synchronous lock: critical sections are a single map
/// operation and never held across an await.
#[derive(Default)]
pub struct MemoryApiKeyStore {
    keys: RwLock<HashMap<String, ApiKey>>,
}

impl MemoryApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a credential under its token.
    pub fn insert(&self, key: ApiKey) {
        self.write_lock().insert(key.token().to_string(), key);
    }

    /// Drop the credential for `token`, if any.
    pub fn remove(&self, token: &str) {
        self.write_lock().remove(token);
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, ApiKey>> {
        self.keys.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ApiKey>> {
        self.keys.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ApiKeyStore for MemoryApiKeyStore {
    async fn get(&self, token: &str) -> Result<Option<ApiKey>> {
        Ok(self.read_lock().get(token).cloned())
    }

    async fn exists(&self, token: &str) -> Result<bool> {
        Ok(self.read_lock().contains_key(token))
    }
}
