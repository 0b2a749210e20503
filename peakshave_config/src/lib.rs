#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the peak-shaving controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section is optional; omitted keys fall back to the defaults the
//!   controller has always run with (15 min slots, 50 W gate, 0.3 kW fallback).
use serde::Deserialize;
use std::path::Path;

/// Minutes in one day; slot granularity must divide it.
pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleCfg {
    /// Path of the expanded schedule document. `{day}` is replaced by YYYY-MM-DD.
    pub path: String,
    /// Width of one slot in minutes.
    pub granularity_minutes: u32,
    /// Treat a document whose `day` differs from today as missing.
    pub require_matching_day: bool,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            path: "www/peak_schedule_today.json".to_string(),
            granularity_minutes: 15,
            require_matching_day: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Minimum |delta| in watts before a new limit is pushed.
    pub threshold_w: u32,
    /// Cap applied while SOC sits below the slot's floor (kW).
    pub fallback_low_soc_kw: f64,
    /// Floor used for slots that omit `soc_floor_pct`.
    pub default_soc_floor_pct: u8,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            threshold_w: 50,
            fallback_low_soc_kw: 0.3,
            default_soc_floor_pct: 15,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EntitiesCfg {
    /// Battery state of charge sensor (percent).
    pub soc: String,
    /// Last known applied export limit (watts), kept fresh by the poller.
    pub current_limit: String,
    /// Boolean helper; "on" means log intent only.
    pub dry_run: String,
}

impl Default for EntitiesCfg {
    fn default() -> Self {
        Self {
            soc: "sensor.battery_soc".to_string(),
            current_limit: "sensor.solis_peak_shaving_power_limit".to_string(),
            dry_run: "input_boolean.schedule_dry_run".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FeedbackCfg {
    /// Signer read endpoint.
    pub path: String,
    /// Field under `data` holding the register value.
    pub metric: String,
    /// Default register id for `poll` when none is passed.
    pub cid: Option<String>,
    /// Default destination key for `poll` when none is passed.
    pub entity_id: Option<String>,
}

impl Default for FeedbackCfg {
    fn default() -> Self {
        Self {
            path: "/v2/api/atRead".to_string(),
            metric: "yuanzhi".to_string(),
            cid: None,
            entity_id: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SignerCfg {
    pub domain: String,
    pub set_limit_service: String,
    pub read_service: String,
}

impl Default for SignerCfg {
    fn default() -> Self {
        Self {
            domain: "solis_signer".to_string(),
            set_limit_service: "set_grid_power_limit".to_string(),
            read_service: "post".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackendMode {
    #[default]
    HomeAssistant,
    Simulated,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackendCfg {
    pub mode: BackendMode,
    /// Falls back to HA_BASE_URL, then http://localhost:8123.
    pub base_url: Option<String>,
    /// Falls back to HA_TOKEN.
    pub token: Option<String>,
    pub timeout_ms: u64,
    /// JSON state file for the simulated backend.
    pub state_file: String,
    /// Register the simulated signer writes applied limits to.
    pub limit_cid: String,
}

impl Default for BackendCfg {
    fn default() -> Self {
        Self {
            mode: BackendMode::HomeAssistant,
            base_url: None,
            token: None,
            timeout_ms: 10_000,
            state_file: "var/peakshave_state.json".to_string(),
            limit_cid: "5035".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
    /// Also write every slot event to the Home Assistant system log.
    pub mirror_to_system_log: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleCfg,
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub entities: EntitiesCfg,
    #[serde(default)]
    pub feedback: FeedbackCfg,
    #[serde(default)]
    pub signer: SignerCfg,
    #[serde(default)]
    pub backend: BackendCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration: {e}"))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Schedule
        if self.schedule.path.trim().is_empty() {
            eyre::bail!("schedule.path must not be empty");
        }
        let g = self.schedule.granularity_minutes;
        if g == 0 || MINUTES_PER_DAY % g != 0 {
            eyre::bail!("schedule.granularity_minutes must be > 0 and divide 1440");
        }

        // Control
        if self.control.threshold_w == 0 {
            eyre::bail!("control.threshold_w must be >= 1");
        }
        let fb = self.control.fallback_low_soc_kw;
        if !fb.is_finite() || fb < 0.0 {
            eyre::bail!("control.fallback_low_soc_kw must be a finite value >= 0.0");
        }
        if self.control.default_soc_floor_pct > 100 {
            eyre::bail!("control.default_soc_floor_pct must be in [0, 100]");
        }

        // Entities
        for (name, key) in [
            ("entities.soc", &self.entities.soc),
            ("entities.current_limit", &self.entities.current_limit),
            ("entities.dry_run", &self.entities.dry_run),
        ] {
            if key.trim().is_empty() {
                eyre::bail!("{name} must not be empty");
            }
        }

        // Feedback
        if !self.feedback.path.starts_with('/') {
            eyre::bail!("feedback.path must start with '/'");
        }
        if self.feedback.metric.trim().is_empty() {
            eyre::bail!("feedback.metric must not be empty");
        }

        // Signer
        if self.signer.domain.trim().is_empty()
            || self.signer.set_limit_service.trim().is_empty()
            || self.signer.read_service.trim().is_empty()
        {
            eyre::bail!("signer.domain and signer services must not be empty");
        }

        // Backend
        if self.backend.timeout_ms == 0 {
            eyre::bail!("backend.timeout_ms must be >= 1");
        }
        if self.backend.mode == BackendMode::Simulated && self.backend.state_file.trim().is_empty()
        {
            eyre::bail!("backend.state_file is required in simulated mode");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = load_toml("").expect("parse");
        assert_eq!(cfg.schedule.granularity_minutes, 15);
        assert_eq!(cfg.control.threshold_w, 50);
        assert!((cfg.control.fallback_low_soc_kw - 0.3).abs() < f64::EPSILON);
        assert_eq!(cfg.backend.mode, BackendMode::HomeAssistant);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn backend_mode_is_snake_case() {
        let cfg = load_toml("[backend]\nmode = \"simulated\"\n").expect("parse");
        assert_eq!(cfg.backend.mode, BackendMode::Simulated);
        assert!(load_toml("[backend]\nmode = \"modbus\"\n").is_err());
    }
}
