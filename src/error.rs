//! Keg error types

/// Keg error types
#[derive(Debug, thiserror::Error)]
pub enum KegError {
    // Authorization errors
    #[error("api key invalid")]
    ApiKeyInvalid,

    #[error("quota exhausted")]
    QuotaExhausted,

    // Client input errors
    #[error("body too large (limit {limit} bytes)")]
    BodyTooLarge { limit: u64 },

    #[error("invalid ttl")]
    InvalidTtl,

    #[error("invalid requested key length")]
    InvalidKeyLength,

    #[error("invalid requested key: {0}")]
    InvalidRequestedKey(&'static str),

    #[error("requested key already exists")]
    RequestedKeyExists,

    /// Unprivileged caller used a privileged-only parameter.
    #[error("not authorized")]
    NotAuthorized,

    // Resource errors
    #[error("record not found")]
    RecordNotFound,

    #[error("record read counter exhausted")]
    CounterExhausted,

    #[error("record expired")]
    RecordExpired,

    // Key-space errors
    /// Key generation escalated past the configured maximum length
    /// without finding a free key.
    #[error("max key length reached")]
    MaxKeyLengthReached,

    // Infrastructure errors
    /// Optimistic update lost to concurrent readers too many times.
    #[error("record update contention")]
    Contention,

    #[error("operation timed out")]
    Timeout,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("compression error: {0}")]
    Compression(String),

    #[error("store error: {0}")]
    Store(String),
}

impl KegError {
    /// Absence-equivalent outcomes.
    ///
    /// Exhausted and expired records are indistinguishable from absent
    /// ones at the retrieval boundary; all three map to a 404-class
    /// response in a caller.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            KegError::RecordNotFound | KegError::CounterExhausted | KegError::RecordExpired
        )
    }

    /// Access-denied-class outcomes (invalid credential, spent quota).
    pub fn is_access_denied(&self) -> bool {
        matches!(self, KegError::ApiKeyInvalid | KegError::QuotaExhausted)
    }

    /// Rejections of the request itself; retrying unchanged will not help.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            KegError::BodyTooLarge { .. }
                | KegError::InvalidTtl
                | KegError::InvalidKeyLength
                | KegError::InvalidRequestedKey(_)
                | KegError::RequestedKeyExists
                | KegError::NotAuthorized
        )
    }

    /// Whether a client may reasonably retry the same request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            KegError::Timeout | KegError::Contention | KegError::Store(_)
        )
    }
}

/// Result type alias for Keg operations
pub type Result<T> = std::result::Result<T, KegError>;
