//! Per-cycle results returned to the host.

use serde::Serialize;

use crate::error::{ScheduleError, SlotError};

/// Terminal decision of a cycle that reached the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    SkipThreshold,
    Simulated,
    Applied,
}

/// Decision snapshot. Built, evaluated, emitted, then dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DispatchDecision {
    pub slot_index: usize,
    pub target_cap_kw: f64,
    pub effective_cap_kw: f64,
    pub soc_pct: f64,
    pub soc_floor_pct: u8,
    pub requested_w: i64,
    pub current_w: i64,
    pub delta_w: i64,
    pub dry_run: bool,
    pub outcome: Outcome,
}

/// Where a dispatcher cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Schedule missing or unreadable; nothing written.
    LoadFailed(ScheduleError),
    /// Current slot is past the end of the document or was rejected; nothing written.
    SlotInvalid {
        day: Option<String>,
        error: SlotError,
    },
    /// |delta| below the threshold.
    Skipped(DispatchDecision),
    /// Dry-run: decision logged, no write.
    Simulated(DispatchDecision),
    /// New limit handed to the signer.
    Applied(DispatchDecision),
}

impl CycleOutcome {
    pub fn decision(&self) -> Option<&DispatchDecision> {
        match self {
            Self::Skipped(d) | Self::Simulated(d) | Self::Applied(d) => Some(d),
            Self::LoadFailed(_) | Self::SlotInvalid { .. } => None,
        }
    }

    /// Stable name used in CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadFailed(_) => "load_failed",
            Self::SlotInvalid { .. } => "slot_invalid",
            Self::Skipped(_) => "skip_threshold",
            Self::Simulated(_) => "simulated",
            Self::Applied(_) => "applied",
        }
    }
}
