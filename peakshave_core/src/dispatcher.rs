//! The control cycle: load → resolve → read state → compute → gate → act.
//!
//! `Dispatcher::preview` evaluates a cycle without side effects (besides reads);
//! `Dispatcher::run_cycle` evaluates the same cycle, emits its event and, when
//! the gate and the dry-run toggle allow it, hands the new limit to the signer.

use peakshave_config::MINUTES_PER_DAY;
use peakshave_traits::{Clock, RemoteSigner, StateStore, SystemClock};

use chrono::{DateTime, FixedOffset, Utc};

use crate::calculator::CapCalculator;
use crate::config::{ControlCfg, EntityKeys};
use crate::error::{BuildError, Result};
use crate::event::{EventEmitter, EventSink, TracingSink};
use crate::gate::{DeltaGate, GateVerdict};
use crate::remote_error::map_remote_error;
use crate::schedule::ScheduleStore;
use crate::status::{CycleOutcome, Outcome};
use crate::telemetry::{DeviceState, read_toggle};

/// Peak-shaving dispatcher. One instance per controlled inverter.
pub struct Dispatcher {
    schedule: Box<dyn ScheduleStore>,
    store: Box<dyn StateStore>,
    signer: Box<dyn RemoteSigner>,
    emitter: EventEmitter,
    clock: Box<dyn Clock>,
    calculator: CapCalculator,
    gate: DeltaGate,
    keys: EntityKeys,
}

impl core::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("calculator", &self.calculator)
            .field("gate", &self.gate)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn threshold_w(&self) -> u64 {
        self.gate.threshold_w()
    }

    pub fn granularity_minutes(&self) -> u32 {
        self.calculator.resolver().granularity_minutes()
    }

    /// Evaluate the cycle for the clock's current time without emitting events
    /// or writing. `Applied` here means "would apply".
    pub fn preview(&self) -> CycleOutcome {
        self.preview_at(self.clock.now())
    }

    /// Evaluate the cycle for an explicit local time.
    pub fn preview_at(&self, now: DateTime<FixedOffset>) -> CycleOutcome {
        let doc = match self.schedule.load(now.date_naive()) {
            Ok(doc) => doc,
            Err(e) => return CycleOutcome::LoadFailed(e),
        };
        let resolved = match self.calculator.resolver().resolve(&now, &doc) {
            Ok(r) => r,
            Err(error) => {
                return CycleOutcome::SlotInvalid {
                    day: doc.day,
                    error,
                };
            }
        };

        let state = DeviceState::read(self.store.as_ref(), &self.keys);
        let computed = self.calculator.cap_for(resolved, &state);
        let dry_run = read_toggle(self.store.as_ref(), &self.keys.dry_run);

        match (self.gate.decide(computed.delta_w), dry_run) {
            (GateVerdict::Skip, _) => {
                CycleOutcome::Skipped(computed.into_decision(dry_run, Outcome::SkipThreshold))
            }
            (GateVerdict::Proceed, true) => {
                CycleOutcome::Simulated(computed.into_decision(true, Outcome::Simulated))
            }
            (GateVerdict::Proceed, false) => {
                CycleOutcome::Applied(computed.into_decision(false, Outcome::Applied))
            }
        }
    }

    /// Run one cycle to a terminal state.
    ///
    /// Schedule and slot problems end the cycle with a warning and `Ok`. A
    /// failed signer write still emits the `slot_apply` event for the attempt,
    /// then surfaces as `Err` with no retry.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let now = self.clock.now();
        let at = now.with_timezone(&Utc);
        let outcome = self.preview_at(now);
        let threshold_w = self.gate.threshold_w();

        match &outcome {
            CycleOutcome::LoadFailed(e) => {
                self.emitter.warn(&e.to_string());
            }
            CycleOutcome::SlotInvalid { day, error } => {
                let day = day.as_deref().unwrap_or("?");
                self.emitter
                    .warn(&format!("invalid slots for day={day}: {error}"));
            }
            CycleOutcome::Skipped(d) | CycleOutcome::Simulated(d) => {
                self.emitter.decision(d, at, threshold_w);
            }
            CycleOutcome::Applied(d) => {
                let threshold = i64::try_from(threshold_w).unwrap_or(i64::MAX);
                let res = self.signer.set_grid_power_limit(d.requested_w, threshold);
                self.emitter.decision(d, at, threshold_w);
                if let Err(e) = res {
                    let err = map_remote_error(e.as_ref());
                    self.emitter.error(&format!(
                        "set_grid_power_limit({}W) failed: {err}",
                        d.requested_w
                    ));
                    return Err(eyre::Report::new(err).wrap_err("set_grid_power_limit"));
                }
            }
        }
        Ok(outcome)
    }
}

/// Builder for `Dispatcher`. Schedule store, state store and signer are
/// required; everything else has a default.
#[derive(Default)]
pub struct DispatcherBuilder {
    schedule: Option<Box<dyn ScheduleStore>>,
    store: Option<Box<dyn StateStore>>,
    signer: Option<Box<dyn RemoteSigner>>,
    sink: Option<Box<dyn EventSink>>,
    clock: Option<Box<dyn Clock>>,
    control: Option<ControlCfg>,
    keys: Option<EntityKeys>,
}

impl DispatcherBuilder {
    pub fn with_schedule(mut self, schedule: impl ScheduleStore + 'static) -> Self {
        self.schedule = Some(Box::new(schedule));
        self
    }
    pub fn with_store(mut self, store: impl StateStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }
    pub fn with_signer(mut self, signer: impl RemoteSigner + 'static) -> Self {
        self.signer = Some(Box::new(signer));
        self
    }
    /// Where events and diagnostics go; defaults to `TracingSink`.
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }
    /// Provide a custom clock; defaults to `SystemClock`.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }
    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.control = Some(control);
        self
    }
    pub fn with_entities(mut self, keys: EntityKeys) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Validate and assemble. Missing pieces and bad parameters are reported
    /// as `BuildError` inside the returned report.
    pub fn try_build(self) -> Result<Dispatcher> {
        let schedule = self
            .schedule
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSchedule))?;
        let store = self
            .store
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStateStore))?;
        let signer = self
            .signer
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSigner))?;

        let control = self.control.unwrap_or_default();
        let g = control.granularity_minutes;
        if g == 0 || MINUTES_PER_DAY % g != 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "granularity_minutes must be > 0 and divide 1440",
            )));
        }
        if control.threshold_w == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "threshold_w must be >= 1",
            )));
        }
        if !control.fallback_low_soc_kw.is_finite() || control.fallback_low_soc_kw < 0.0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "fallback_low_soc_kw must be a finite value >= 0",
            )));
        }

        let sink = self.sink.unwrap_or_else(|| Box::new(TracingSink));
        let clock = self.clock.unwrap_or_else(|| Box::new(SystemClock::new()));

        Ok(Dispatcher {
            schedule,
            store,
            signer,
            emitter: EventEmitter::new(sink),
            clock,
            calculator: CapCalculator::from_cfg(&control),
            gate: DeltaGate::new(control.threshold_w),
            keys: self.keys.unwrap_or_default(),
        })
    }
}
