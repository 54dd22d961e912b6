//! Request validation policy.
//!
//! A pure function of the request parameters, the privilege level, and
//! the configured [`ValidationLimits`]. Returns the first violated rule;
//! callers must not depend on seeing more than one error per request.
//!
//! Unprivileged requests cannot name their own key, cannot be eternal
//! (zero TTL), and live under the tighter body/TTL/key-length bounds.
//! Privileged requests unlock all of those but still respect the global
//! maximum key length and the key charset.

use crate::config::ValidationLimits;
use crate::store::keys;
use crate::types::CacheRequest;
use crate::{KegError, Result};

/// Validate a cache request under the given privilege level.
///
/// Expects `requested_key_length` to be normalized already (zero
/// replaced by the configured default).
pub fn validate(request: &CacheRequest, privileged: bool, limits: &ValidationLimits) -> Result<()> {
    if privileged {
        validate_privileged(request, limits)?;
    } else {
        validate_unprivileged(request, limits)?;
    }
    validate_common(request, limits)
}

fn validate_unprivileged(request: &CacheRequest, limits: &ValidationLimits) -> Result<()> {
    if request.requested_key.is_some() {
        return Err(KegError::NotAuthorized);
    }

    if request.body_len() > limits.unprivileged_max_body_bytes {
        return Err(KegError::BodyTooLarge {
            limit: limits.unprivileged_max_body_bytes,
        });
    }

    // Zero TTL means eternal, which is privileged-only; it falls below
    // the global minimum here.
    if request.ttl < limits.min_ttl() {
        return Err(KegError::InvalidTtl);
    }

    if request.ttl > limits.unprivileged_max_ttl() {
        return Err(KegError::InvalidTtl);
    }

    if request.requested_key_length < limits.unprivileged_min_key_length {
        return Err(KegError::InvalidKeyLength);
    }

    Ok(())
}

fn validate_privileged(request: &CacheRequest, limits: &ValidationLimits) -> Result<()> {
    if let Some(requested) = &request.requested_key {
        if requested.len() > usize::from(limits.max_key_length) {
            return Err(KegError::InvalidRequestedKey("too long"));
        }

        if requested.len() < usize::from(limits.privileged_min_key_length) {
            return Err(KegError::InvalidRequestedKey("too short"));
        }

        if !keys::in_charset(requested) {
            return Err(KegError::InvalidRequestedKey("contains illegal char"));
        }
    }

    if request.body_len() > limits.privileged_max_body_bytes {
        return Err(KegError::BodyTooLarge {
            limit: limits.privileged_max_body_bytes,
        });
    }

    // Zero TTL (eternal) is allowed here; only the upper bound applies.
    if request.ttl > limits.privileged_max_ttl() {
        return Err(KegError::InvalidTtl);
    }

    if request.requested_key_length < limits.privileged_min_key_length {
        return Err(KegError::InvalidKeyLength);
    }

    Ok(())
}

fn validate_common(request: &CacheRequest, limits: &ValidationLimits) -> Result<()> {
    if request.requested_key_length > limits.max_key_length {
        return Err(KegError::InvalidKeyLength);
    }

    Ok(())
}
