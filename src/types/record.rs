//! The stored-record state machine.
//!
//! A [`Record`] carries two independent expiry dimensions and both must
//! pass for a read to succeed: a wall-clock [`ExpirationDate`] and a
//! [`DisposableCounter`] of remaining permitted reads. Either dimension
//! may be *eternal*, which disables that check entirely.
//!
//! Reads go through [`Record::read_body`], which checks counter
//! exhaustion first, then expiration, then mutates both counters.
//! Counter exhaustion takes precedence when both conditions hold.
//! [`Record::raw_body`] bypasses everything and exists for storage
//! adapters that need to serialize the record without consuming a read.

use std::time::{Duration, SystemTime};

use crate::{KegError, Result};

/// Absolute expiration instant, or eternal.
///
/// Constructed from a TTL at write time; a zero TTL means the record
/// never expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationDate {
    deadline: Option<SystemTime>,
}

impl ExpirationDate {
    /// Expiration `ttl` from now. A zero TTL yields an eternal date.
    pub fn from_ttl(ttl: Duration) -> Self {
        if ttl.is_zero() {
            return Self::eternal();
        }
        Self {
            deadline: Some(SystemTime::now() + ttl),
        }
    }

    /// A date that never expires.
    pub fn eternal() -> Self {
        Self { deadline: None }
    }

    /// Rebuild from a persisted deadline. Used by storage adapters.
    pub fn from_deadline(deadline: Option<SystemTime>) -> Self {
        Self { deadline }
    }

    pub fn is_eternal(&self) -> bool {
        self.deadline.is_none()
    }

    pub fn expired(&self) -> bool {
        match self.deadline {
            None => false,
            Some(deadline) => SystemTime::now() > deadline,
        }
    }

    /// Remaining duration until expiration; zero when eternal or past due.
    pub fn until(&self) -> Duration {
        match self.deadline {
            None => Duration::ZERO,
            Some(deadline) => deadline
                .duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO),
        }
    }

    /// The absolute deadline, if any.
    pub fn deadline(&self) -> Option<SystemTime> {
        self.deadline
    }
}

/// Remaining permitted reads for a record.
///
/// Floors at zero; eternal counters never decrement and never exhaust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisposableCounter {
    remaining: u8,
    eternal: bool,
}

impl DisposableCounter {
    pub fn new(remaining: u8, eternal: bool) -> Self {
        Self { remaining, eternal }
    }

    /// Consume one read. No-op when eternal or already at zero.
    pub fn sub(&mut self) {
        if self.eternal {
            return;
        }
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// True once a non-eternal counter has no reads left.
    pub fn exhausted(&self) -> bool {
        !self.eternal && self.remaining < 1
    }

    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    pub fn is_eternal(&self) -> bool {
        self.eternal
    }
}

/// A stored paste: body bytes plus the lifecycle state governing reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    body: Vec<u8>,
    expiration: ExpirationDate,
    counter: DisposableCounter,
    clicks: u32,
    url: bool,
}

impl Record {
    /// Create a fresh record at write time.
    ///
    /// `disposable == 0` means unlimited reads (an eternal counter).
    /// `url` marks the body as a redirect target rather than raw content.
    pub fn new(body: Vec<u8>, expiration: ExpirationDate, disposable: u8, url: bool) -> Self {
        Self {
            body,
            expiration,
            counter: DisposableCounter::new(disposable, disposable == 0),
            clicks: 0,
            url,
        }
    }

    /// Rebuild a record from persisted fields. Used by storage adapters.
    pub fn from_parts(
        body: Vec<u8>,
        expiration: ExpirationDate,
        counter: DisposableCounter,
        clicks: u32,
        url: bool,
    ) -> Self {
        Self {
            body,
            expiration,
            counter,
            clicks,
            url,
        }
    }

    /// Perform one read: verify the counter is not exhausted, verify the
    /// record is not expired, then decrement the disposable counter,
    /// increment clicks, and return the body.
    ///
    /// Clicks only move on successful reads; a rejected read leaves the
    /// record untouched.
    pub fn read_body(&mut self) -> Result<&[u8]> {
        if self.counter.exhausted() {
            return Err(KegError::CounterExhausted);
        }
        if self.expiration.expired() {
            return Err(KegError::RecordExpired);
        }

        self.counter.sub();
        self.clicks += 1;

        Ok(&self.body)
    }

    /// Raw body accessor bypassing all checks and counter mutation.
    ///
    /// For storage adapters only; the caller-facing read path is
    /// [`Record::read_body`].
    pub fn raw_body(&self) -> &[u8] {
        &self.body
    }

    /// Consume the record, yielding its body.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    pub fn clicks(&self) -> u32 {
        self.clicks
    }

    pub fn is_url(&self) -> bool {
        self.url
    }

    pub fn expiration(&self) -> &ExpirationDate {
        &self.expiration
    }

    pub fn counter(&self) -> &DisposableCounter {
        &self.counter
    }

    /// Remaining duration until expiration; zero when eternal.
    ///
    /// Storage adapters use this to set the store-level expiry.
    pub fn until(&self) -> Duration {
        self.expiration.until()
    }
}
