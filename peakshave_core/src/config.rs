//! Runtime configuration for the control loop.
//!
//! These are the structs the core works with. They are separate from the
//! TOML-deserialized config in `peakshave_config`; see `conversions`.

/// Cap computation and gating parameters.
#[derive(Debug, Clone)]
pub struct ControlCfg {
    /// Minimum |requested - current| in watts before a write is attempted.
    pub threshold_w: u64,
    /// Cap (kW) honoured while SOC is below the slot floor.
    pub fallback_low_soc_kw: f64,
    /// Slot width in minutes. Must divide 1440.
    pub granularity_minutes: u32,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            threshold_w: 50,
            fallback_low_soc_kw: 0.3,
            granularity_minutes: 15,
        }
    }
}

/// State store keys read by the dispatcher.
#[derive(Debug, Clone)]
pub struct EntityKeys {
    pub soc: String,
    pub current_limit: String,
    pub dry_run: String,
}

impl Default for EntityKeys {
    fn default() -> Self {
        Self {
            soc: "sensor.battery_soc".to_string(),
            current_limit: "sensor.solis_peak_shaving_power_limit".to_string(),
            dry_run: "input_boolean.schedule_dry_run".to_string(),
        }
    }
}

/// Request shape used by the feedback poller.
#[derive(Debug, Clone)]
pub struct FeedbackCfg {
    /// Signer read endpoint.
    pub path: String,
    /// Field under `data` carrying the register value.
    pub metric: String,
}

impl Default for FeedbackCfg {
    fn default() -> Self {
        Self {
            path: "/v2/api/atRead".to_string(),
            metric: "yuanzhi".to_string(),
        }
    }
}
