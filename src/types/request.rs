//! Inbound cache-request parameters.

use std::time::Duration;

/// TTL applied when a request does not specify one: thirty days.
///
/// Matches the configured default in [`ValidationLimits`](crate::config::ValidationLimits).
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Parameters of one inbound cache request.
///
/// Constructed per request and consumed once by
/// [`CacheService::serve`](crate::service::CacheService::serve).
/// A `requested_key_length` of zero means "use the configured default";
/// a `disposable` of zero means unlimited reads; a zero `ttl` means
/// eternal (privileged only).
///
/// ```rust
/// use keg::CacheRequest;
/// use std::time::Duration;
///
/// let request = CacheRequest::new("hello world")
///     .source_ip("203.0.113.7")
///     .ttl(Duration::from_secs(3600))
///     .disposable(3);
/// ```
#[derive(Debug, Clone)]
pub struct CacheRequest {
    /// Bearer secret for privileged access, if presented.
    pub api_key: Option<String>,
    /// Caller-chosen key name (privileged only).
    pub requested_key: Option<String>,
    /// Source IP literal, keyed for the anonymous quota.
    pub source_ip: String,
    /// The content to cache, or a URL when `is_url` is set.
    pub body: Vec<u8>,
    /// Time to live; zero means eternal.
    pub ttl: Duration,
    /// Generated key length; zero means the configured default.
    pub requested_key_length: u8,
    /// Permitted reads; zero means unlimited.
    pub disposable: u8,
    /// Successful retrieval should signal redirect semantics.
    pub is_url: bool,
}

impl CacheRequest {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            api_key: None,
            requested_key: None,
            source_ip: String::new(),
            body: body.into(),
            ttl: DEFAULT_TTL,
            requested_key_length: 0,
            disposable: 0,
            is_url: false,
        }
    }

    pub fn api_key(mut self, token: impl Into<String>) -> Self {
        self.api_key = Some(token.into());
        self
    }

    pub fn requested_key(mut self, key: impl Into<String>) -> Self {
        self.requested_key = Some(key.into());
        self
    }

    pub fn source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = ip.into();
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Eternal storage: the record never expires. Privileged only.
    pub fn eternal(mut self) -> Self {
        self.ttl = Duration::ZERO;
        self
    }

    pub fn requested_key_length(mut self, length: u8) -> Self {
        self.requested_key_length = length;
        self
    }

    pub fn disposable(mut self, reads: u8) -> Self {
        self.disposable = reads;
        self
    }

    pub fn url(mut self) -> Self {
        self.is_url = true;
        self
    }

    /// Body length in bytes, as validated against the size limits.
    pub fn body_len(&self) -> u64 {
        self.body.len() as u64
    }
}
