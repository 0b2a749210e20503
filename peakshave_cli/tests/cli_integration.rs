use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::{TempDir, tempdir};

const LIMIT: &str = "sensor.solis_peak_shaving_power_limit";

struct Fixture {
    dir: TempDir,
    cfg: PathBuf,
}

impl Fixture {
    /// Simulated backend; every slot of the day asks for 3.2 kW with a 20 % floor.
    fn new(with_feedback_defaults: bool) -> Self {
        let dir = tempdir().unwrap();
        let slots: Vec<Value> = (0..96)
            .map(|_| json!({ "target_cap_kw": 3.2, "soc_floor_pct": 20 }))
            .collect();
        fs::write(
            dir.path().join("schedule.json"),
            json!({ "slots": slots }).to_string(),
        )
        .unwrap();

        let feedback = if with_feedback_defaults {
            format!("[feedback]\ncid = \"5035\"\nentity_id = \"{LIMIT}\"\n")
        } else {
            String::new()
        };
        let toml = format!(
            r#"
[schedule]
path = '{schedule}'

[backend]
mode = "simulated"
state_file = '{state}'

{feedback}
"#,
            schedule = dir.path().join("schedule.json").display(),
            state = dir.path().join("state.json").display(),
        );
        let cfg = dir.path().join("peakshave.toml");
        fs::write(&cfg, toml).unwrap();

        let fx = Self { dir, cfg };
        fx.write_state(json!({
            "states": { "sensor.battery_soc": "55", "sensor.solis_peak_shaving_power_limit": "1000" },
            "registers": { "5035": 1000 }
        }));
        fx
    }

    fn state_path(&self) -> PathBuf {
        self.dir.path().join("state.json")
    }

    fn write_state(&self, v: Value) {
        fs::write(self.state_path(), v.to_string()).unwrap();
    }

    fn state(&self) -> Value {
        serde_json::from_str(&fs::read_to_string(self.state_path()).unwrap()).unwrap()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("peakshave_cli").unwrap();
        cmd.env_remove("RUST_LOG")
            .env_remove("PEAKSHAVE_SIM_SIGNER_FAIL")
            .arg("--config")
            .arg(&self.cfg);
        cmd
    }
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["dispatch"], 0, "applied: slot", "stdout")]
#[case(&["status"], 0, "(would apply)", "stdout")]
#[case(&["self-check"], 0, "ok: schedule", "stdout")]
#[case(&["poll"], 4, "Required parameter `cid`", "stderr")]
#[case(&["poll", "--cid", "5035"], 4, "Required parameter `entity_id`", "stderr")]
#[case(&["watch", "--poll-every", "0"], 5, "Invalid configuration", "stderr")]
#[case(&["frobnicate"], 2, "unrecognized subcommand", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let fx = Fixture::new(false);
    let mut cmd = fx.cmd();
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn dispatch_writes_limit_through_signer() {
    let fx = Fixture::new(false);
    fx.cmd().arg("dispatch").assert().success();
    assert_eq!(fx.state()["registers"]["5035"], 3200);
}

#[test]
fn status_never_writes() {
    let fx = Fixture::new(false);
    fx.cmd().arg("status").assert().success();
    assert_eq!(fx.state()["registers"]["5035"], 1000);
}

#[rstest]
#[case("on", "simulated: slot")]
#[case("ON ", "simulated: slot")]
#[case("off", "applied: slot")]
#[case("unavailable", "applied: slot")]
fn dry_run_toggle(#[case] toggle: &str, #[case] needle: &str) {
    let fx = Fixture::new(false);
    fx.write_state(json!({
        "states": {
            "sensor.battery_soc": "55",
            "sensor.solis_peak_shaving_power_limit": "1000",
            "input_boolean.schedule_dry_run": toggle
        },
        "registers": { "5035": 1000 }
    }));
    fx.cmd()
        .arg("dispatch")
        .assert()
        .success()
        .stdout(predicate::str::contains(needle));
    let expected = if needle.starts_with("simulated") { 1000 } else { 3200 };
    assert_eq!(fx.state()["registers"]["5035"], expected);
}

#[test]
fn low_soc_curtails_to_fallback() {
    let fx = Fixture::new(false);
    fx.write_state(json!({
        "states": { "sensor.battery_soc": "12", "sensor.solis_peak_shaving_power_limit": "3000" },
        "registers": {}
    }));
    fx.cmd()
        .arg("dispatch")
        .assert()
        .success()
        .stdout(predicate::str::contains("-> 300 W"));
    assert_eq!(fx.state()["registers"]["5035"], 300);
}

#[test]
fn small_delta_is_skipped() {
    let fx = Fixture::new(false);
    fx.write_state(json!({
        "states": { "sensor.battery_soc": "55", "sensor.solis_peak_shaving_power_limit": "3180" },
        "registers": { "5035": 3180 }
    }));
    fx.cmd()
        .arg("dispatch")
        .assert()
        .success()
        .stdout(predicate::str::contains("skip_threshold"));
    assert_eq!(fx.state()["registers"]["5035"], 3180);
}

#[test]
fn missing_schedule_is_not_an_error() {
    let fx = Fixture::new(false);
    fs::remove_file(fx.dir.path().join("schedule.json")).unwrap();
    fx.cmd()
        .arg("dispatch")
        .assert()
        .success()
        .stdout(predicate::str::contains("load_failed"));
    assert_eq!(fx.state()["registers"]["5035"], 1000);
}

#[test]
fn signer_failure_exits_with_transport_code() {
    let fx = Fixture::new(false);
    fx.cmd()
        .env("PEAKSHAVE_SIM_SIGNER_FAIL", "1")
        .arg("dispatch")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("What happened: The remote call failed"));
}

#[test]
fn missing_config_exits_with_config_code() {
    let fx = Fixture::new(false);
    let mut cmd = Command::cargo_bin("peakshave_cli").unwrap();
    cmd.arg("--config")
        .arg(fx.dir.path().join("nope.toml"))
        .arg("dispatch")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn invalid_granularity_is_a_config_error() {
    let fx = Fixture::new(false);
    let text = fs::read_to_string(&fx.cfg).unwrap();
    fs::write(
        &fx.cfg,
        text.replace("[schedule]\n", "[schedule]\ngranularity_minutes = 7\n"),
    )
    .unwrap();
    fx.cmd()
        .arg("status")
        .assert()
        .code(5)
        .stderr(predicate::str::contains("granularity_minutes"));
}

#[test]
fn dispatch_then_poll_closes_the_loop() {
    let fx = Fixture::new(true);
    fx.cmd().arg("dispatch").assert().success();
    fx.cmd()
        .arg("poll")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{LIMIT} = 3200")));
    assert_eq!(fx.state()["states"][LIMIT], "3200");

    fx.cmd()
        .arg("dispatch")
        .assert()
        .success()
        .stdout(predicate::str::contains("skip_threshold"));
}

#[test]
fn poll_flags_override_config() {
    let fx = Fixture::new(true);
    fx.cmd()
        .args(["poll", "--cid", "43011", "--entity-id", "input_text.solis_cid_43011_raw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("input_text.solis_cid_43011_raw = 0"));
    assert_eq!(fx.state()["states"]["input_text.solis_cid_43011_raw"], "0");
}
