//! API-key credential.

use rand::Rng;
use rand::distr::Alphanumeric;
use uuid::Uuid;

/// Length of generated secret tokens.
const TOKEN_LENGTH: usize = 32;

/// A privileged-access credential.
///
/// The `token` is the bearer secret presented with cache requests; the
/// `public_id` identifies the credential in logs and usage events
/// without revealing the secret. Issuance and administration live
/// outside this crate — the cache path only ever reads credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey {
    token: String,
    public_id: Uuid,
    valid: bool,
}

impl ApiKey {
    /// Wrap an existing token with a fresh public id.
    pub fn new(token: impl Into<String>, valid: bool) -> Self {
        Self {
            token: token.into(),
            public_id: Uuid::new_v4(),
            valid,
        }
    }

    /// Rebuild from persisted fields. Used by storage adapters.
    pub fn from_parts(token: impl Into<String>, public_id: Uuid, valid: bool) -> Self {
        Self {
            token: token.into(),
            public_id,
            valid,
        }
    }

    /// Issue a credential with a random secret token.
    pub fn generate() -> Self {
        Self::new(generate_token(), true)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn public_id(&self) -> Uuid {
        self.public_id
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    /// Revoke the credential.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Restore a revoked credential.
    pub fn reauthorize(&mut self) {
        self.valid = true;
    }
}

/// Random alphanumeric secret from the OS-seeded CSPRNG.
fn generate_token() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique_and_sized() {
        let a = ApiKey::generate();
        let b = ApiKey::generate();
        assert_eq!(a.token().len(), TOKEN_LENGTH);
        assert_ne!(a.token(), b.token());
        assert_ne!(a.public_id(), b.public_id());
        assert!(a.valid());
    }

    #[test]
    fn invalidate_and_reauthorize_toggle_validity() {
        let mut key = ApiKey::new("secret", true);
        key.invalidate();
        assert!(!key.valid());
        key.reauthorize();
        assert!(key.valid());
    }
}
