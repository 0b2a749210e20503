//! Requested cap for "now": slot resolution, SOC fallback, kW → W.

use chrono::Timelike;

use crate::config::ControlCfg;
use crate::error::SlotError;
use crate::schedule::ScheduleDocument;
use crate::slot::{ResolvedSlot, SlotResolver};
use crate::soc_guard::SocGuard;
use crate::status::{DispatchDecision, Outcome};
use crate::telemetry::DeviceState;
use crate::util::{kw_to_w, round_watts};

/// Partial decision: everything except the dry-run flag and the outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapComputation {
    pub slot_index: usize,
    pub target_cap_kw: f64,
    pub effective_cap_kw: f64,
    pub soc_pct: f64,
    pub soc_floor_pct: u8,
    pub requested_w: i64,
    pub current_w: i64,
    pub delta_w: i64,
}

impl CapComputation {
    /// True when the SOC guard lowered the slot's target.
    pub fn curtailed(&self) -> bool {
        self.effective_cap_kw < self.target_cap_kw
    }

    pub fn into_decision(self, dry_run: bool, outcome: Outcome) -> DispatchDecision {
        DispatchDecision {
            slot_index: self.slot_index,
            target_cap_kw: self.target_cap_kw,
            effective_cap_kw: self.effective_cap_kw,
            soc_pct: self.soc_pct,
            soc_floor_pct: self.soc_floor_pct,
            requested_w: self.requested_w,
            current_w: self.current_w,
            delta_w: self.delta_w,
            dry_run,
            outcome,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CapCalculator {
    resolver: SlotResolver,
    guard: SocGuard,
}

impl CapCalculator {
    pub fn new(resolver: SlotResolver, guard: SocGuard) -> Self {
        Self { resolver, guard }
    }

    pub fn from_cfg(cfg: &ControlCfg) -> Self {
        Self::new(
            SlotResolver::new(cfg.granularity_minutes),
            SocGuard::new(cfg.fallback_low_soc_kw),
        )
    }

    pub fn resolver(&self) -> &SlotResolver {
        &self.resolver
    }

    /// Resolve the slot for `now`, then compute the cap against `state`.
    pub fn compute<T: Timelike>(
        &self,
        now: &T,
        doc: &ScheduleDocument,
        state: &DeviceState,
    ) -> Result<CapComputation, SlotError> {
        let resolved = self.resolver.resolve(now, doc)?;
        Ok(self.cap_for(resolved, state))
    }

    /// Cap computation for an already resolved slot.
    pub fn cap_for(&self, resolved: ResolvedSlot, state: &DeviceState) -> CapComputation {
        let ResolvedSlot { index, slot } = resolved;
        let effective_cap_kw = self
            .guard
            .apply(slot.target_cap_kw, state.soc_pct, slot.soc_floor_pct);
        let requested_w = kw_to_w(effective_cap_kw);
        let current_w = round_watts(state.current_limit_w);
        CapComputation {
            slot_index: index,
            target_cap_kw: slot.target_cap_kw,
            effective_cap_kw,
            soc_pct: state.soc_pct,
            soc_floor_pct: slot.soc_floor_pct,
            requested_w,
            current_w,
            delta_w: requested_w.saturating_sub(current_w),
        }
    }
}
