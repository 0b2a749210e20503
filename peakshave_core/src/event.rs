//! Structured slot events and the sinks that receive them.
//!
//! Every gated decision produces exactly one `SlotEvent` with a fixed schema so
//! downstream consumers can correlate cycles. Diagnostics (load warnings,
//! poller errors) travel through the same sink with a `Severity`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::status::{DispatchDecision, Outcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SlotSkipThreshold,
    SlotApply,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SlotSkipThreshold => "slot_skip_threshold",
            Self::SlotApply => "slot_apply",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warning",
            Self::Error => "error",
        }
    }
}

/// Emitted record. Field order and names are the wire schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotEvent {
    pub slot_index: usize,
    /// UTC, ISO-8601 with microseconds and a trailing `Z`.
    pub timestamp: String,
    pub current_limit_w: i64,
    pub requested_limit_w: i64,
    pub delta_w: i64,
    pub soc_pct: f64,
    pub soc_floor_pct: u8,
    pub dry_run: bool,
    pub event: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_w: Option<u64>,
}

impl SlotEvent {
    pub fn from_decision(d: &DispatchDecision, at: DateTime<Utc>, threshold_w: u64) -> Self {
        let (event, threshold_w) = match d.outcome {
            Outcome::SkipThreshold => (EventKind::SlotSkipThreshold, Some(threshold_w)),
            Outcome::Simulated | Outcome::Applied => (EventKind::SlotApply, None),
        };
        Self {
            slot_index: d.slot_index,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, true),
            current_limit_w: d.current_w,
            requested_limit_w: d.requested_w,
            delta_w: d.delta_w,
            soc_pct: d.soc_pct,
            soc_floor_pct: d.soc_floor_pct,
            dry_run: d.dry_run,
            event,
            threshold_w,
        }
    }

    /// Skips are debug noise; applies (real or simulated) are info.
    pub fn severity(&self) -> Severity {
        match self.event {
            EventKind::SlotSkipThreshold => Severity::Debug,
            EventKind::SlotApply => Severity::Info,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// One-line operator summary.
    pub fn summary(&self) -> String {
        match self.event {
            EventKind::SlotSkipThreshold => format!(
                "slot={} keep limit {}W (requested {}W, delta {}W < {}W)",
                self.slot_index,
                self.current_limit_w,
                self.requested_limit_w,
                self.delta_w,
                self.threshold_w.unwrap_or_default(),
            ),
            EventKind::SlotApply => format!(
                "slot={} apply limit {}W (prev {}W, soc={:.1}%, floor={}%, dry_run={})",
                self.slot_index,
                self.requested_limit_w,
                self.current_limit_w,
                self.soc_pct,
                self.soc_floor_pct,
                self.dry_run,
            ),
        }
    }
}

/// Receiver of slot events and diagnostics.
pub trait EventSink {
    fn emit(&mut self, event: &SlotEvent);
    fn log(&mut self, severity: Severity, message: &str);
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn emit(&mut self, event: &SlotEvent) {
        (**self).emit(event);
    }
    fn log(&mut self, severity: Severity, message: &str) {
        (**self).log(severity, message);
    }
}

/// Fan-out: both sinks receive every record.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &SlotEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
    fn log(&mut self, severity: Severity, message: &str) {
        self.0.log(severity, message);
        self.1.log(severity, message);
    }
}

/// Sink writing through `tracing`; with a JSON subscriber each schema field
/// becomes a JSON field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, e: &SlotEvent) {
        let summary = e.summary();
        match e.event {
            EventKind::SlotSkipThreshold => tracing::debug!(
                target: "peakshave::slot",
                event = e.event.as_str(),
                slot_index = e.slot_index,
                timestamp = %e.timestamp,
                current_limit_w = e.current_limit_w,
                requested_limit_w = e.requested_limit_w,
                delta_w = e.delta_w,
                soc_pct = e.soc_pct,
                soc_floor_pct = e.soc_floor_pct,
                dry_run = e.dry_run,
                threshold_w = e.threshold_w,
                "schedule_slot {summary}"
            ),
            EventKind::SlotApply => tracing::info!(
                target: "peakshave::slot",
                event = e.event.as_str(),
                slot_index = e.slot_index,
                timestamp = %e.timestamp,
                current_limit_w = e.current_limit_w,
                requested_limit_w = e.requested_limit_w,
                delta_w = e.delta_w,
                soc_pct = e.soc_pct,
                soc_floor_pct = e.soc_floor_pct,
                dry_run = e.dry_run,
                "schedule_slot {summary}"
            ),
        }
    }

    fn log(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!(target: "peakshave", "{message}"),
            Severity::Info => tracing::info!(target: "peakshave", "{message}"),
            Severity::Warn => tracing::warn!(target: "peakshave", "{message}"),
            Severity::Error => tracing::error!(target: "peakshave", "{message}"),
        }
    }
}

/// Builds the event for each decision and forwards it, plus diagnostics, to a
/// sink.
pub struct EventEmitter {
    sink: Box<dyn EventSink>,
}

impl core::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventEmitter").finish_non_exhaustive()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(Box::new(TracingSink))
    }
}

impl EventEmitter {
    pub fn new(sink: Box<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Emit the record for a gated decision; returns what was emitted.
    pub fn decision(
        &mut self,
        d: &DispatchDecision,
        at: DateTime<Utc>,
        threshold_w: u64,
    ) -> SlotEvent {
        let event = SlotEvent::from_decision(d, at, threshold_w);
        self.sink.emit(&event);
        event
    }

    pub fn debug(&mut self, message: &str) {
        self.sink.log(Severity::Debug, message);
    }

    pub fn info(&mut self, message: &str) {
        self.sink.log(Severity::Info, message);
    }

    pub fn warn(&mut self, message: &str) {
        self.sink.log(Severity::Warn, message);
    }

    pub fn error(&mut self, message: &str) {
        self.sink.log(Severity::Error, message);
    }
}
