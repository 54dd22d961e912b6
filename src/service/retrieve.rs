//! The read path.
//!
//! A read is a mutation: it decrements the disposable counter and
//! increments the click counter. The mutation is committed with a
//! version-checked store update, so two concurrent reads of a record
//! with one remaining read cannot both succeed — the loser of the
//! update re-reads and finds the counter already spent.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::debug;

use crate::store::RecordStore;
use crate::telemetry;
use crate::{KegError, Result};

/// Retries of the read-update cycle before giving up as contended.
const MAX_UPDATE_RETRIES: u32 = 4;

/// A successful retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieved {
    pub body: Vec<u8>,
    /// The body is a redirect target, not raw content.
    pub is_url: bool,
}

/// Serves retrieval requests.
pub struct RetrieveService {
    records: Arc<dyn RecordStore>,
    op_timeout: Duration,
}

impl RetrieveService {
    pub fn new(records: Arc<dyn RecordStore>, op_timeout: Duration) -> Self {
        Self {
            records,
            op_timeout,
        }
    }

    /// Read the record under `key`, consuming one permitted read.
    ///
    /// Exhausted and expired records are removed on sight and reported
    /// as [`KegError::CounterExhausted`] / [`KegError::RecordExpired`];
    /// both are absence-equivalent to callers (see
    /// [`KegError::is_not_found`]).
    pub async fn get_body(&self, key: &str) -> Result<Retrieved> {
        match timeout(self.op_timeout, self.get_body_inner(key)).await {
            Ok(result) => result,
            Err(_) => Err(KegError::Timeout),
        }
    }

    async fn get_body_inner(&self, key: &str) -> Result<Retrieved> {
        for _ in 0..MAX_UPDATE_RETRIES {
            let Some(entry) = self.records.get(key).await? else {
                read_outcome("not_found");
                return Err(KegError::RecordNotFound);
            };

            let mut record = entry.record;
            match record.read_body() {
                Ok(_) => {}
                Err(err @ KegError::CounterExhausted) => {
                    self.records.remove(key).await?;
                    read_outcome("exhausted");
                    return Err(err);
                }
                Err(err @ KegError::RecordExpired) => {
                    self.records.remove(key).await?;
                    read_outcome("expired");
                    return Err(err);
                }
                Err(err) => return Err(err),
            }

            if self.records.update(key, &record, entry.version).await? {
                read_outcome("ok");
                let is_url = record.is_url();
                return Ok(Retrieved {
                    body: record.into_body(),
                    is_url,
                });
            }

            metrics::counter!(telemetry::UPDATE_CONFLICTS_TOTAL).increment(1);
            debug!(key, "record changed under us, retrying read");
        }

        Err(KegError::Contention)
    }

    /// Click count for the record under `key`, without consuming a read.
    pub async fn get_clicks(&self, key: &str) -> Result<u32> {
        match timeout(self.op_timeout, self.get_clicks_inner(key)).await {
            Ok(result) => result,
            Err(_) => Err(KegError::Timeout),
        }
    }

    async fn get_clicks_inner(&self, key: &str) -> Result<u32> {
        let Some(entry) = self.records.get(key).await? else {
            return Err(KegError::RecordNotFound);
        };

        if entry.record.expiration().expired() {
            self.records.remove(key).await?;
            return Err(KegError::RecordExpired);
        }

        Ok(entry.record.clicks())
    }
}

fn read_outcome(status: &'static str) {
    metrics::counter!(telemetry::RECORDS_READ_TOTAL, "status" => status).increment(1);
}
