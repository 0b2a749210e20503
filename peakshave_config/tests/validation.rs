use peakshave_config::{BackendMode, load_file, load_toml};
use rstest::rstest;
use std::fs;
use tempfile::tempdir;

#[rstest]
#[case("[schedule]\ngranularity_minutes = 0\n", "granularity_minutes")]
#[case("[schedule]\ngranularity_minutes = 7\n", "divide 1440")]
#[case("[control]\nthreshold_w = 0\n", "threshold_w must be >= 1")]
#[case("[control]\nfallback_low_soc_kw = -0.1\n", "fallback_low_soc_kw")]
#[case("[control]\ndefault_soc_floor_pct = 101\n", "default_soc_floor_pct")]
#[case("[entities]\nsoc = \"  \"\n", "entities.soc must not be empty")]
#[case("[feedback]\npath = \"v2/api/atRead\"\n", "feedback.path must start with '/'")]
#[case("[signer]\ndomain = \"\"\n", "signer.domain")]
#[case("[backend]\ntimeout_ms = 0\n", "timeout_ms must be >= 1")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "expected '{needle}' in '{err}'"
    );
}

#[rstest]
#[case(15)]
#[case(30)]
#[case(60)]
#[case(5)]
fn accepts_granularities_dividing_the_day(#[case] minutes: u32) {
    let cfg = load_toml(&format!("[schedule]\ngranularity_minutes = {minutes}\n")).expect("parse");
    cfg.validate().expect("valid granularity");
}

#[test]
fn loads_full_file_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("peakshave.toml");
    fs::write(
        &path,
        r#"
[schedule]
path = "www/peak_schedule_{day}.json"
granularity_minutes = 15
require_matching_day = true

[control]
threshold_w = 100
fallback_low_soc_kw = 0.5

[entities]
soc = "sensor.house_battery_soc"

[feedback]
cid = "5035"
entity_id = "input_text.solis_cid_5035_raw"

[backend]
mode = "simulated"
state_file = "state.json"

[logging]
level = "debug"
rotation = "daily"
"#,
    )
    .unwrap();

    let cfg = load_file(&path).expect("load config");
    assert!(cfg.schedule.require_matching_day);
    assert_eq!(cfg.control.threshold_w, 100);
    assert_eq!(cfg.entities.soc, "sensor.house_battery_soc");
    // untouched keys keep their defaults
    assert_eq!(cfg.entities.dry_run, "input_boolean.schedule_dry_run");
    assert_eq!(cfg.feedback.cid.as_deref(), Some("5035"));
    assert_eq!(cfg.backend.mode, BackendMode::Simulated);
}

#[test]
fn missing_file_is_reported_with_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = load_file(&path).expect_err("missing file");
    assert!(format!("{err}").contains("absent.toml"));
}

#[test]
fn shipped_sample_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../etc/peakshave.toml");
    let cfg = load_file(&path).expect("sample config loads");
    assert_eq!(cfg.backend.mode, BackendMode::HomeAssistant);
    assert_eq!(cfg.feedback.cid.as_deref(), Some("5035"));
    assert_eq!(
        cfg.feedback.entity_id.as_deref(),
        Some("input_text.solis_cid_5035_raw")
    );
    assert_eq!(cfg.logging.rotation.as_deref(), Some("daily"));
}
