//! Tests for metrics emission.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use keg::telemetry;
use keg::{CacheRequest, Config, Keg, KegError};

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

/// Sum all counter values matching a given metric name, optionally
/// requiring a label pair.
fn counter_total(snapshot: &SnapshotVec, name: &str, label: Option<(&str, &str)>) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .filter(|(key, _, _, _)| match label {
            None => true,
            Some((k, v)) => key
                .key()
                .labels()
                .any(|l| l.key() == k && l.value() == v),
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Runs async work within a local recorder scope on the multi-thread
/// runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
fn with_recorder<T>(recorder: &DebuggingRecorder, work: impl Future<Output = T>) -> T {
    metrics::with_local_recorder(recorder, || {
        tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(work))
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn writes_and_reads_record_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    with_recorder(&recorder, async {
        let keg = Keg::builder().build().unwrap();
        let key = keg
            .cache(CacheRequest::new("hello").source_ip("203.0.113.7"))
            .await
            .unwrap();
        keg.get_body(&key).await.unwrap();
        let err = keg.get_body("absentabsent00").await.unwrap_err();
        assert!(matches!(err, KegError::RecordNotFound));
    });

    let snapshot = snapshotter.snapshot().into_vec();

    assert_eq!(
        counter_total(
            &snapshot,
            telemetry::RECORDS_WRITTEN_TOTAL,
            Some(("privileged", "false")),
        ),
        1
    );
    assert_eq!(
        counter_total(&snapshot, telemetry::RECORDS_READ_TOTAL, Some(("status", "ok"))),
        1
    );
    assert_eq!(
        counter_total(
            &snapshot,
            telemetry::RECORDS_READ_TOTAL,
            Some(("status", "not_found")),
        ),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn spent_quota_records_a_counter()  {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    with_recorder(&recorder, async {
        let mut config = Config::default();
        config.quota.quota = 1;
        let keg = Keg::builder().config(config).build().unwrap();
        keg.cache(CacheRequest::new("a").source_ip("203.0.113.7"))
            .await
            .unwrap();
        let err = keg
            .cache(CacheRequest::new("b").source_ip("203.0.113.7"))
            .await
            .unwrap_err();
        assert!(matches!(err, KegError::QuotaExhausted));
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(&snapshot, telemetry::QUOTA_EXHAUSTED_TOTAL, None),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn exhausted_disposable_read_labelled() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    with_recorder(&recorder, async {
        let keg = Keg::builder().build().unwrap();
        let key = keg
            .cache(
                CacheRequest::new("once")
                    .source_ip("203.0.113.7")
                    .disposable(1),
            )
            .await
            .unwrap();
        keg.get_body(&key).await.unwrap();
        let _ = keg.get_body(&key).await;
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_total(
            &snapshot,
            telemetry::RECORDS_READ_TOTAL,
            Some(("status", "exhausted")),
        ),
        1
    );
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let keg = Keg::builder().build().unwrap();
    let key = keg
        .cache(CacheRequest::new("quiet").source_ip("203.0.113.7"))
        .await
        .unwrap();
    keg.get_body(&key).await.unwrap();
}
