use peakshave_core::mocks::{MemoryStore, RecordingSigner, RecordingSink};
use peakshave_core::{FeedbackCfg, FeedbackPoller, PollOutcome, Severity};
use rstest::rstest;
use serde_json::json;

const DEST: &str = "sensor.solis_peak_shaving_power_limit";

#[test]
fn publishes_truncated_register_value() {
    let store = MemoryStore::new().with(DEST, "1200");
    let signer = RecordingSigner::new().responding(json!({"data": {"yuanzhi": "2999.7"}}));
    let sink = RecordingSink::new();
    let mut poller = FeedbackPoller::new(signer.clone(), store.clone(), FeedbackCfg::default())
        .with_sink(sink.clone());

    let out = poller.poll(Some("5035"), Some(DEST)).expect("poll");
    let PollOutcome::Published(reading) = out else {
        panic!("expected published, got {out:?}");
    };
    assert_eq!(reading.raw_value, "2999");
    assert_eq!(store.value(DEST).as_deref(), Some("2999"));
    assert_eq!(
        signer.reads(),
        vec![("/v2/api/atRead".to_string(), json!({"cid": 5035}))]
    );
    let logs = sink.logs();
    assert!(logs.iter().any(|(_, m)| m == "CID 5035: yuanzhi = 2999"));
    assert!(logs.iter().any(|(_, m)| m == &format!("set {DEST} = 2999")));
}

#[test]
fn transport_error_is_logged_and_store_untouched() {
    let store = MemoryStore::new().with(DEST, "1200");
    let sink = RecordingSink::new();
    let mut poller = FeedbackPoller::new(
        RecordingSigner::new().failing(),
        store.clone(),
        FeedbackCfg::default(),
    )
    .with_sink(sink.clone());

    let out = poller.poll(Some("5035"), Some(DEST)).expect("never raises");
    assert!(matches!(out, PollOutcome::Failed { ref cid, .. } if cid == "5035"));
    assert_eq!(store.value(DEST).as_deref(), Some("1200"));
    assert!(
        sink.logs()
            .iter()
            .any(|(s, m)| *s == Severity::Error && m.contains("signer unreachable"))
    );
}

#[rstest]
#[case::no_body(None)]
#[case::no_data(Some(json!({"status": "ok"})))]
#[case::non_numeric(Some(json!({"data": {"yuanzhi": "busy"}})))]
#[case::wrong_metric(Some(json!({"data": {"other": 12}})))]
fn unusable_response_publishes_zero(#[case] response: Option<serde_json::Value>) {
    let store = MemoryStore::new();
    let signer = match response {
        Some(r) => RecordingSigner::new().responding(r),
        None => RecordingSigner::new(),
    };
    let mut poller = FeedbackPoller::new(signer, store.clone(), FeedbackCfg::default());
    poller.poll(Some("5035"), Some(DEST)).expect("poll");
    assert_eq!(store.value(DEST).as_deref(), Some("0"));
}

#[test]
fn custom_request_shape_is_honoured() {
    let store = MemoryStore::new();
    let signer = RecordingSigner::new().responding(json!({"data": {"value": 42.9}}));
    let cfg = FeedbackCfg {
        path: "/v1/read".to_string(),
        metric: "value".to_string(),
    };
    let mut poller = FeedbackPoller::new(signer.clone(), store.clone(), cfg);
    poller.poll(Some("lim-A"), Some("sensor.x")).expect("poll");
    assert_eq!(store.value("sensor.x").as_deref(), Some("42"));
    assert_eq!(
        signer.reads(),
        vec![("/v1/read".to_string(), json!({"cid": "lim-A"}))]
    );
}
