//! Key generation over the fixed charset.
//!
//! Generated keys double as bearer tokens for private pastes, so
//! candidates are drawn from the OS-seeded CSPRNG — collision
//! resistance and unpredictability both matter.

use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::store::RecordStore;
use crate::telemetry;
use crate::{KegError, Result};

/// The 62-symbol alphanumeric key charset.
pub const KEY_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Whether every character of `key` belongs to [`KEY_CHARSET`].
pub fn in_charset(key: &str) -> bool {
    key.bytes().all(|b| KEY_CHARSET.contains(&b))
}

/// One random candidate key of the given length.
pub fn random_key(length: u8) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..KEY_CHARSET.len());
            KEY_CHARSET[idx] as char
        })
        .collect()
}

/// Generates unique keys against a [`RecordStore`].
///
/// Unbounded-retry-with-escalation: candidates start at the requested
/// minimum length; after `escalation_budget` consecutive collisions the
/// working length grows by one and the budget resets, trading a longer
/// key for continued availability under key-space pressure. Fails with
/// [`KegError::MaxKeyLengthReached`] once the working length passes the
/// maximum. The caller's operation deadline bounds the loop in time.
pub struct KeyGenerator {
    store: Arc<dyn RecordStore>,
    escalation_budget: u8,
}

impl KeyGenerator {
    /// `escalation_budget` must be at least 1; lower values are clamped.
    pub fn new(store: Arc<dyn RecordStore>, escalation_budget: u8) -> Self {
        Self {
            store,
            escalation_budget: escalation_budget.max(1),
        }
    }

    /// Generate a key of at least `min_length` that does not exist in
    /// the store at the time of the check.
    pub async fn generate(&self, min_length: u8, max_length: u8) -> Result<String> {
        let mut length = min_length;
        let mut budget = self.escalation_budget;

        loop {
            if length > max_length {
                return Err(KegError::MaxKeyLengthReached);
            }

            let candidate = random_key(length);
            if !self.store.exists(&candidate).await? {
                return Ok(candidate);
            }

            metrics::counter!(telemetry::KEY_COLLISIONS_TOTAL).increment(1);
            budget -= 1;
            if budget == 0 {
                length += 1;
                budget = self.escalation_budget;
                metrics::counter!(telemetry::KEY_LENGTH_ESCALATIONS_TOTAL).increment(1);
                debug!(length, "key space pressure, growing key length");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_key_has_requested_length_and_charset() {
        for length in [1u8, 8, 14, 20] {
            let key = random_key(length);
            assert_eq!(key.len(), usize::from(length));
            assert!(in_charset(&key));
        }
    }

    #[test]
    fn random_keys_differ() {
        // 14 chars over 62 symbols; a collision here means the RNG is broken.
        assert_ne!(random_key(14), random_key(14));
    }

    #[test]
    fn charset_membership() {
        assert!(in_charset("aZ09"));
        assert!(!in_charset("with space"));
        assert!(!in_charset("under_score"));
        assert!(!in_charset("dash-ed"));
        assert!(in_charset(""));
    }
}
