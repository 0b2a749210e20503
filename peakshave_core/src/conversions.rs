//! `From` implementations bridging `peakshave_config` types to core types.

use crate::config::{ControlCfg, EntityKeys, FeedbackCfg};
use crate::schedule::FileScheduleStore;

// ── ControlCfg ───────────────────────────────────────────────────────────────

impl From<&peakshave_config::Config> for ControlCfg {
    fn from(c: &peakshave_config::Config) -> Self {
        Self {
            threshold_w: u64::from(c.control.threshold_w),
            fallback_low_soc_kw: c.control.fallback_low_soc_kw,
            granularity_minutes: c.schedule.granularity_minutes,
        }
    }
}

// ── EntityKeys ───────────────────────────────────────────────────────────────

impl From<&peakshave_config::EntitiesCfg> for EntityKeys {
    fn from(c: &peakshave_config::EntitiesCfg) -> Self {
        Self {
            soc: c.soc.clone(),
            current_limit: c.current_limit.clone(),
            dry_run: c.dry_run.clone(),
        }
    }
}

// ── FeedbackCfg ──────────────────────────────────────────────────────────────

impl From<&peakshave_config::FeedbackCfg> for FeedbackCfg {
    fn from(c: &peakshave_config::FeedbackCfg) -> Self {
        Self {
            path: c.path.clone(),
            metric: c.metric.clone(),
        }
    }
}

// ── FileScheduleStore ────────────────────────────────────────────────────────

impl From<&peakshave_config::Config> for FileScheduleStore {
    fn from(c: &peakshave_config::Config) -> Self {
        FileScheduleStore::new(&c.schedule.path)
            .with_default_soc_floor(c.control.default_soc_floor_pct)
            .require_matching_day(c.schedule.require_matching_day)
    }
}
