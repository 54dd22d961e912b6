//! Telemetry metric name constants.
//!
//! Centralised metric names for keg operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `keg_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `privileged` — "true" | "false", whether a valid API key backed the request
//! - `status` — read outcome: "ok" | "not_found" | "exhausted" | "expired"

/// Total records written by the cache path.
///
/// Labels: `privileged`.
pub const RECORDS_WRITTEN_TOTAL: &str = "keg_records_written_total";

/// Total retrieval attempts.
///
/// Labels: `status` ("ok" | "not_found" | "exhausted" | "expired").
pub const RECORDS_READ_TOTAL: &str = "keg_records_read_total";

/// Total generated key candidates that collided with an existing key.
pub const KEY_COLLISIONS_TOTAL: &str = "keg_key_collisions_total";

/// Total times the key generator grew the working key length after
/// exhausting its collision budget.
pub const KEY_LENGTH_ESCALATIONS_TOTAL: &str = "keg_key_length_escalations_total";

/// Total unprivileged writes rejected for a spent per-IP quota.
pub const QUOTA_EXHAUSTED_TOTAL: &str = "keg_quota_exhausted_total";

/// Total record bodies gzip-compressed before the store write.
pub const COMPRESSED_BODIES_TOTAL: &str = "keg_compressed_bodies_total";

/// Total optimistic-update conflicts on the retrieval path.
pub const UPDATE_CONFLICTS_TOTAL: &str = "keg_update_conflicts_total";

/// Total usage events dropped because the audit queue was full.
pub const USAGE_EVENTS_DROPPED_TOTAL: &str = "keg_usage_events_dropped_total";
