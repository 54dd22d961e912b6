//! Storage capability traits and backends.
//!
//! Each consumer gets the minimal operation set it needs rather than
//! one fat storage interface: the cache path needs record writes and an
//! atomic quota decrement, the retrieval path needs versioned record
//! reads, and authorization needs a credential lookup. This keeps every
//! service testable against small in-memory fakes, and lets an external
//! KV backend (anything offering existence checks, per-key expiry, and
//! atomic increments) implement only the seams it serves.
//!
//! The bundled [`memory`] backend is an in-process implementation on
//! moka; it is the store of record for single-instance deployments and
//! the reference semantics for external backends.

pub mod compression;
pub mod keys;
pub mod memory;

use async_trait::async_trait;

use crate::Result;
use crate::types::{ApiKey, Record};

/// A record plus the store version observed when it was read.
///
/// The version feeds [`RecordStore::update`] for optimistic
/// concurrency: two concurrent readers of the same disposable record
/// both observe the pre-decrement state, but only one update with the
/// observed version wins; the loser re-reads and retries.
#[derive(Debug, Clone)]
pub struct VersionedRecord {
    pub record: Record,
    pub version: u64,
}

/// Persistent record storage with per-key expiry.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Whether a record exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Fetch the record under `key` with its current version.
    ///
    /// Returns `None` for absent keys; expired entries count as absent.
    /// Compressed bodies are transparently decompressed.
    async fn get(&self, key: &str) -> Result<Option<VersionedRecord>>;

    /// Write a fresh record, setting the store-level expiry from the
    /// record's remaining TTL (none when eternal). Bodies above the
    /// configured threshold are gzip-compressed.
    async fn put(&self, key: &str, record: &Record) -> Result<()>;

    /// Conditionally overwrite the record under `key`.
    ///
    /// Succeeds (returns `true`) only when the stored version still
    /// equals `expected_version`; returns `false` on conflict or when
    /// the entry vanished. Counter mutations must go through this, never
    /// through an unguarded read-modify-write.
    async fn update(&self, key: &str, record: &Record, expected_version: u64) -> Result<bool>;

    /// Drop the record under `key`, if any.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Per-source-IP quota storage.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Atomically decrement the IP's allowance, creating it at the
    /// configured default first if absent, and return the
    /// post-decrement value. Never loses decrements under concurrency.
    async fn decrement(&self, source_ip: &str) -> Result<i64>;

    /// Current allowance for the IP, if one is tracked.
    async fn get(&self, source_ip: &str) -> Result<Option<i64>>;
}

/// Read-only credential lookup.
///
/// Issuance and revocation are administrative flows outside the cache
/// core, which only ever reads.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Look up a credential by its secret token.
    async fn get(&self, token: &str) -> Result<Option<ApiKey>>;

    /// Whether a credential exists for the token.
    async fn exists(&self, token: &str) -> Result<bool>;
}

pub use keys::{KEY_CHARSET, KeyGenerator};
pub use memory::{MemoryApiKeyStore, MemoryQuotaStore, MemoryRecordStore};
