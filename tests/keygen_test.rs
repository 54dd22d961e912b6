//! Tests for unique-key generation under key-space pressure.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use keg::Result;
use keg::store::{KEY_CHARSET, KeyGenerator, RecordStore, VersionedRecord};

/// Store whose `exists` answers true for the first `collisions` probes,
/// recording lengths as they come in.
struct CollidingStore {
    collisions: u32,
    probes: AtomicU32,
}

impl CollidingStore {
    fn new(collisions: u32) -> Self {
        Self {
            collisions,
            probes: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl RecordStore for CollidingStore {
    async fn exists(&self, _key: &str) -> Result<bool> {
        let probe = self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(probe < self.collisions)
    }

    async fn get(&self, _key: &str) -> Result<Option<VersionedRecord>> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _record: &keg::Record) -> Result<()> {
        Ok(())
    }

    async fn update(
        &self,
        _key: &str,
        _record: &keg::Record,
        _expected_version: u64,
    ) -> Result<bool> {
        Ok(false)
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn free_key_found_first_try() {
    let generator = KeyGenerator::new(Arc::new(CollidingStore::new(0)), 20);
    let key = generator.generate(8, 20).await.unwrap();
    assert_eq!(key.len(), 8);
    assert!(key.bytes().all(|b| KEY_CHARSET.contains(&b)));
}

#[tokio::test]
async fn collisions_within_budget_keep_the_length() {
    let generator = KeyGenerator::new(Arc::new(CollidingStore::new(19)), 20);
    let key = generator.generate(8, 20).await.unwrap();
    assert_eq!(key.len(), 8);
}

#[tokio::test]
async fn exhausted_budget_grows_the_length() {
    // 20 collisions spend the budget at length 8; the 21st probe runs
    // at length 9 and succeeds.
    let generator = KeyGenerator::new(Arc::new(CollidingStore::new(20)), 20);
    let key = generator.generate(8, 20).await.unwrap();
    assert_eq!(key.len(), 9);
}

#[tokio::test]
async fn repeated_escalation_spans_multiple_lengths() {
    let store = Arc::new(CollidingStore::new(7));
    let generator = KeyGenerator::new(store, 3);
    // Budgets of 3 at lengths 8 and 9, then one collision at 10.
    let key = generator.generate(8, 20).await.unwrap();
    assert_eq!(key.len(), 10);
}

#[tokio::test]
async fn escalation_past_the_maximum_fails() {
    let generator = KeyGenerator::new(Arc::new(CollidingStore::new(u32::MAX)), 2);
    let err = generator.generate(19, 20).await.unwrap_err();
    assert!(matches!(err, keg::KegError::MaxKeyLengthReached));
}
