//! Core domain types: records, quotas, credentials, request parameters.

mod apikey;
mod quota;
mod record;
mod request;

pub use apikey::ApiKey;
pub use quota::Quota;
pub use record::{DisposableCounter, ExpirationDate, Record};
pub use request::{CacheRequest, DEFAULT_TTL};
