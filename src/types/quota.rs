//! Per-source-IP write allowance.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::{KegError, Result};

/// Decrementing per-IP allowance for unprivileged writes.
///
/// The counter is an atomic integer so concurrent in-flight requests
/// from the same IP never lose a decrement to a read-modify-write race.
/// The value may go negative before being observed as exhausted; the
/// exhaustion boundary is `value < 1`.
#[derive(Debug)]
pub struct Quota {
    value: AtomicI64,
    default: i64,
}

impl Quota {
    /// Create a quota at its configured default.
    ///
    /// A default below 1 is a configuration error, not a valid
    /// "always exhausted" state.
    pub fn new(default: i64) -> Result<Self> {
        if default < 1 {
            return Err(KegError::Configuration(format!(
                "quota default must be at least 1, got {default}"
            )));
        }
        Ok(Self::unchecked(default))
    }

    /// Construct without the default check. The caller must have
    /// validated the default already.
    pub(crate) fn unchecked(default: i64) -> Self {
        Self {
            value: AtomicI64::new(default),
            default,
        }
    }

    /// Atomically decrement by one, returning the post-decrement value.
    pub fn sub(&self) -> i64 {
        self.value.fetch_sub(1, Ordering::AcqRel) - 1
    }

    /// True once the allowance has been spent (`value < 1`).
    pub fn exhausted(&self) -> bool {
        self.value() < 1
    }

    /// Reset to the configured default.
    pub fn refresh(&self) {
        self.value.store(self.default, Ordering::Release);
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }
}
