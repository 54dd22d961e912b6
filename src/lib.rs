//! Keg - content cache with record lifecycles
//!
//! This crate provides a pastebin-style content cache: opaque bodies are
//! stored under short unique keys with a time-to-live, an optional
//! read countdown (disposable records), and a click counter. Anonymous
//! writes are rate limited per source IP; an API key unlocks the
//! privileged features (custom keys, short keys, large bodies, eternal
//! storage) and every privileged write is attributed through a usage
//! event stream.
//!
//! # Example
//!
//! ```rust,no_run
//! use keg::{CacheRequest, Keg};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> keg::Result<()> {
//!     let keg = Keg::builder().build()?;
//!
//!     let key = keg
//!         .cache(
//!             CacheRequest::new("hello world")
//!                 .source_ip("203.0.113.7")
//!                 .ttl(Duration::from_secs(3600))
//!                 .disposable(3),
//!         )
//!         .await?;
//!
//!     let retrieved = keg.get_body(&key).await?;
//!     println!("{}", String::from_utf8_lossy(&retrieved.body));
//!     Ok(())
//! }
//! ```

mod builder;
pub mod config;
pub mod error;
pub mod events;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod types;
mod validate;

// Re-export main types at crate root
pub use builder::{Keg, KegBuilder};
pub use config::Config;
pub use error::{KegError, Result};
pub use events::{EventPublisher, UsageEvent, UsageReason};
pub use service::{CacheService, Retrieved, RetrieveService};
pub use types::{
    ApiKey, CacheRequest, DEFAULT_TTL, DisposableCounter, ExpirationDate, Quota, Record,
};
