//! Composition root: the [`Keg`] facade and its builder.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::config::Config;
use crate::events::{EventPublisher, UsageEvent};
use crate::service::{CacheService, Retrieved, RetrieveService};
use crate::store::{
    ApiKeyStore, KeyGenerator, MemoryApiKeyStore, MemoryQuotaStore, MemoryRecordStore, QuotaStore,
    RecordStore,
};
use crate::types::{ApiKey, CacheRequest};
use crate::Result;

/// The assembled cache: one write path, one read path, one event queue.
///
/// Build one per process with [`Keg::builder`] and share it behind an
/// `Arc`; all operations take `&self`.
pub struct Keg {
    cache: CacheService,
    retrieve: RetrieveService,
    usage_events: Mutex<Option<ReceiverStream<UsageEvent>>>,
}

impl std::fmt::Debug for Keg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keg").finish_non_exhaustive()
    }
}

impl Keg {
    pub fn builder() -> KegBuilder {
        KegBuilder::default()
    }

    /// Cache a record, returning the key it was stored under.
    pub async fn cache(&self, request: CacheRequest) -> Result<String> {
        self.cache.serve(request).await
    }

    /// Read the record under `key`, consuming one permitted read.
    pub async fn get_body(&self, key: &str) -> Result<Retrieved> {
        self.retrieve.get_body(key).await
    }

    /// Click count for the record under `key`, without consuming a read.
    pub async fn get_clicks(&self, key: &str) -> Result<u32> {
        self.retrieve.get_clicks(key).await
    }

    /// Take the usage-event stream. Yields `Some` exactly once.
    ///
    /// While untaken (or after the stream is dropped), events beyond the
    /// queue capacity are dropped with a warning.
    pub fn take_usage_events(&self) -> Option<ReceiverStream<UsageEvent>> {
        match self.usage_events.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// Builder for [`Keg`].
///
/// Every store has an in-process default; override the seams you need:
///
/// ```rust,no_run
/// use keg::{ApiKey, Keg};
///
/// # fn main() -> keg::Result<()> {
/// let keg = Keg::builder()
///     .api_key(ApiKey::generate())
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct KegBuilder {
    config: Option<Config>,
    config_path: Option<PathBuf>,
    records: Option<Arc<dyn RecordStore>>,
    quotas: Option<Arc<dyn QuotaStore>>,
    api_keys: Option<Arc<dyn ApiKeyStore>>,
    preloaded_keys: Vec<ApiKey>,
}

impl KegBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use this configuration instead of loading one from disk.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from this path instead of the standard
    /// locations. Ignored when [`config`](KegBuilder::config) is set.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Replace the record store (default: in-process moka).
    pub fn record_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.records = Some(store);
        self
    }

    /// Replace the quota store (default: in-process moka).
    pub fn quota_store(mut self, store: Arc<dyn QuotaStore>) -> Self {
        self.quotas = Some(store);
        self
    }

    /// Replace the credential store (default: in-process map).
    ///
    /// Overriding it discards any keys added via
    /// [`api_key`](KegBuilder::api_key).
    pub fn api_key_store(mut self, store: Arc<dyn ApiKeyStore>) -> Self {
        self.api_keys = Some(store);
        self
    }

    /// Preload a credential into the default in-process store.
    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.preloaded_keys.push(key);
        self
    }

    /// Assemble the [`Keg`].
    ///
    /// Fails on invalid configuration or an unreadable config file.
    pub fn build(self) -> Result<Keg> {
        let config = match self.config {
            Some(config) => config,
            None => match &self.config_path {
                Some(path) => Config::load(Some(path))?,
                None => Config::default(),
            },
        };
        config.validate()?;

        let records: Arc<dyn RecordStore> = match self.records {
            Some(store) => store,
            None => Arc::new(MemoryRecordStore::new(
                &config.caching,
                config.limits.privileged_max_body_bytes,
            )),
        };

        let quotas: Arc<dyn QuotaStore> = match self.quotas {
            Some(store) => store,
            None => Arc::new(MemoryQuotaStore::new(&config.quota)?),
        };

        let api_keys: Arc<dyn ApiKeyStore> = match self.api_keys {
            Some(store) => store,
            None => {
                let store = MemoryApiKeyStore::new();
                for key in self.preloaded_keys {
                    store.insert(key);
                }
                Arc::new(store)
            }
        };

        let keygen = KeyGenerator::new(
            Arc::clone(&records),
            config.caching.key_escalation_attempts,
        );
        let (events, event_stream) = EventPublisher::channel(config.events.queue_capacity);
        let op_timeout = config.store.op_timeout();

        info!(
            quota = config.quota.quota,
            default_key_length = config.limits.default_key_length,
            op_timeout_secs = config.store.op_timeout_secs,
            "keg assembled"
        );

        Ok(Keg {
            cache: CacheService::new(
                Arc::clone(&records),
                quotas,
                api_keys,
                keygen,
                config.limits.clone(),
                events,
                op_timeout,
            ),
            retrieve: RetrieveService::new(records, op_timeout),
            usage_events: Mutex::new(Some(event_stream)),
        })
    }
}
