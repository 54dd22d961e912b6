//! The write path.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::ValidationLimits;
use crate::events::{EventPublisher, UsageEvent, UsageReason};
use crate::store::{ApiKeyStore, KeyGenerator, QuotaStore, RecordStore};
use crate::telemetry;
use crate::types::{ApiKey, CacheRequest, ExpirationDate, Record};
use crate::validate;
use crate::{KegError, Result};

/// Serves cache (write) requests.
///
/// One [`serve`](CacheService::serve) call runs the full write flow:
/// credential check, parameter validation under the resulting privilege
/// level, key resolution (caller-chosen or generated), the store write,
/// then accounting — a usage event for privileged writes, a quota
/// decrement for anonymous ones.
pub struct CacheService {
    records: Arc<dyn RecordStore>,
    quotas: Arc<dyn QuotaStore>,
    api_keys: Arc<dyn ApiKeyStore>,
    keygen: KeyGenerator,
    limits: ValidationLimits,
    events: EventPublisher,
    op_timeout: Duration,
}

impl CacheService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        quotas: Arc<dyn QuotaStore>,
        api_keys: Arc<dyn ApiKeyStore>,
        keygen: KeyGenerator,
        limits: ValidationLimits,
        events: EventPublisher,
        op_timeout: Duration,
    ) -> Self {
        Self {
            records,
            quotas,
            api_keys,
            keygen,
            limits,
            events,
            op_timeout,
        }
    }

    /// Cache a record, returning the key it was stored under.
    ///
    /// The anonymous quota is settled after the write, so a write that
    /// spends the last allowance still lands; the caller sees
    /// [`KegError::QuotaExhausted`] only once the allowance has already
    /// gone negative.
    pub async fn serve(&self, request: CacheRequest) -> Result<String> {
        match timeout(self.op_timeout, self.serve_inner(request)).await {
            Ok(result) => result,
            Err(_) => Err(KegError::Timeout),
        }
    }

    async fn serve_inner(&self, mut request: CacheRequest) -> Result<String> {
        let credential = self.authorize(&request).await?;
        let privileged = credential.is_some();

        if request.requested_key_length == 0 {
            request.requested_key_length = self.limits.default_key_length;
        }

        validate::validate(&request, privileged, &self.limits)?;

        let key = self.resolve_key(&request).await?;

        // Settled before the body is moved into the record.
        let reason = usage_reason(&request, &self.limits);

        let record = Record::new(
            std::mem::take(&mut request.body),
            ExpirationDate::from_ttl(request.ttl),
            request.disposable,
            request.is_url,
        );
        self.records.put(&key, &record).await?;

        let privileged_label = if privileged { "true" } else { "false" };
        metrics::counter!(telemetry::RECORDS_WRITTEN_TOTAL, "privileged" => privileged_label)
            .increment(1);
        info!(
            key = %key,
            privileged,
            body_bytes = record.raw_body().len(),
            "record cached"
        );

        match credential {
            Some(credential) => self.account_usage(&credential, reason, &request.source_ip),
            None => self.apply_quota(&request.source_ip).await?,
        }

        Ok(key)
    }

    /// Resolve the credential, if one was presented.
    ///
    /// An unknown token and a revoked one both map to
    /// [`KegError::ApiKeyInvalid`], so a failed lookup reveals nothing
    /// about whether the token exists.
    async fn authorize(&self, request: &CacheRequest) -> Result<Option<ApiKey>> {
        let Some(token) = &request.api_key else {
            return Ok(None);
        };

        match self.api_keys.get(token).await? {
            Some(credential) if credential.valid() => Ok(Some(credential)),
            _ => {
                warn!(source_ip = %request.source_ip, "rejected api key");
                Err(KegError::ApiKeyInvalid)
            }
        }
    }

    async fn resolve_key(&self, request: &CacheRequest) -> Result<String> {
        if let Some(requested) = &request.requested_key {
            if self.records.exists(requested).await? {
                return Err(KegError::RequestedKeyExists);
            }
            return Ok(requested.clone());
        }

        self.keygen
            .generate(request.requested_key_length, self.limits.max_key_length)
            .await
    }

    /// Emit a usage event when the write exercised a privileged feature.
    fn account_usage(&self, credential: &ApiKey, reason: Option<UsageReason>, source_ip: &str) {
        if let Some(reason) = reason {
            self.events
                .notify(UsageEvent::new(credential.public_id(), reason, source_ip));
        }
    }

    /// Settle the anonymous quota for a completed write.
    async fn apply_quota(&self, source_ip: &str) -> Result<()> {
        let remaining = self.quotas.decrement(source_ip).await?;
        if remaining < 0 {
            metrics::counter!(telemetry::QUOTA_EXHAUSTED_TOTAL).increment(1);
            warn!(source_ip, "anonymous quota exhausted");
            return Err(KegError::QuotaExhausted);
        }
        Ok(())
    }
}

/// The most significant privileged feature a request used, if any.
///
/// Expects `requested_key_length` to be normalized already.
fn usage_reason(request: &CacheRequest, limits: &ValidationLimits) -> Option<UsageReason> {
    if request.ttl.is_zero() || request.ttl > limits.unprivileged_max_ttl() {
        return Some(UsageReason::PersistentKey);
    }
    if request.requested_key_length < limits.unprivileged_min_key_length {
        return Some(UsageReason::CustomKeyLength);
    }
    if request.requested_key.is_some() {
        return Some(UsageReason::CustomKey);
    }
    if request.body_len() > limits.unprivileged_max_body_bytes {
        return Some(UsageReason::LargeBody);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ValidationLimits {
        ValidationLimits::default()
    }

    fn plain_request() -> CacheRequest {
        CacheRequest::new("body")
            .source_ip("192.0.2.1")
            .requested_key_length(14)
    }

    #[test]
    fn no_privileged_feature_no_reason() {
        assert_eq!(usage_reason(&plain_request(), &limits()), None);
    }

    #[test]
    fn persistence_outranks_everything() {
        let request = plain_request()
            .eternal()
            .requested_key("abc")
            .requested_key_length(3);
        assert_eq!(
            usage_reason(&request, &limits()),
            Some(UsageReason::PersistentKey)
        );
    }

    #[test]
    fn short_key_length_outranks_custom_key() {
        let request = plain_request().requested_key("abc").requested_key_length(3);
        assert_eq!(
            usage_reason(&request, &limits()),
            Some(UsageReason::CustomKeyLength)
        );
    }

    #[test]
    fn custom_key_outranks_large_body() {
        let request = CacheRequest::new(vec![0u8; 2 * 1024 * 1024])
            .source_ip("192.0.2.1")
            .requested_key_length(14)
            .requested_key("abc");
        assert_eq!(
            usage_reason(&request, &limits()),
            Some(UsageReason::CustomKey)
        );
    }

    #[test]
    fn large_body_alone() {
        let request = CacheRequest::new(vec![0u8; 2 * 1024 * 1024])
            .source_ip("192.0.2.1")
            .requested_key_length(14);
        assert_eq!(
            usage_reason(&request, &limits()),
            Some(UsageReason::LargeBody)
        );
    }
}
