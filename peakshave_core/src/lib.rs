#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Peak-shaving export-limit control (backend-agnostic).
//!
//! Every slot boundary the dispatcher reads the day's expanded schedule, picks
//! the slot for "now", curtails its export cap when the battery is below the
//! slot's SOC floor, and pushes the resulting limit to the inverter through a
//! remote signer, unless the change is too small to matter or dry-run is on.
//! A separate poller keeps the "current limit" feedback value fresh.
//!
//! All I/O goes through `peakshave_traits::{StateStore, RemoteSigner, Clock}`
//! and the `ScheduleStore` / `EventSink` traits defined here.
//!
//! ## Pipeline
//!
//! - **ScheduleStore** loads the `ScheduleDocument` (`schedule` module)
//! - **SlotResolver** maps wall-clock time to a slot (`slot` module)
//! - **SocGuard** + **CapCalculator** produce the requested watts
//! - **DeltaGate** suppresses sub-threshold changes (`gate` module)
//! - **Dispatcher** runs the cycle and reports a `CycleOutcome`
//! - **EventEmitter** turns each decision into a `SlotEvent` (`event` module)
//!
//! ## Rounding
//!
//! kW → W rounds to the nearest watt with ties to even (`2.345 kW` → `2345 W`,
//! `2.5 W` → `2 W`), see `util::round_watts`.

pub mod calculator;
pub mod config;
pub mod conversions;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod feedback;
pub mod gate;
pub mod mocks;
pub mod remote_error;
pub mod schedule;
pub mod slot;
pub mod soc_guard;
pub mod status;
pub mod telemetry;
pub mod util;

pub use calculator::{CapCalculator, CapComputation};
pub use config::{ControlCfg, EntityKeys, FeedbackCfg};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{BuildError, ControlError, Report, Result, ScheduleError, SlotError};
pub use event::{EventEmitter, EventKind, EventSink, Severity, SlotEvent, TracingSink};
pub use feedback::{FeedbackPoller, FeedbackReading, PollOutcome, extract_metric};
pub use gate::{DeltaGate, GateVerdict};
pub use schedule::{FileScheduleStore, ScheduleDocument, ScheduleStore, Slot};
pub use slot::{ResolvedSlot, SlotResolver};
pub use soc_guard::SocGuard;
pub use status::{CycleOutcome, DispatchDecision, Outcome};
pub use telemetry::DeviceState;
