//! Service layer: the write path and the read path.
//!
//! [`CacheService`] owns the full write flow (authorization, validation,
//! key resolution, the store write, accounting); [`RetrieveService`]
//! owns reads, including the version-checked counter update. Both wrap
//! every public operation in the configured deadline so a stalled store
//! surfaces as [`KegError::Timeout`](crate::KegError::Timeout) instead
//! of hanging the caller.

mod cache;
mod retrieve;

pub use cache::CacheService;
pub use retrieve::{Retrieved, RetrieveService};
