#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Concrete backends for `StateStore`, `RemoteSigner` and `EventSink`.
//!
//! - `ha`: Home Assistant REST API (entity states, signer services, system log)
//! - `sim`: a local JSON file standing in for both, for offline runs and tests

pub mod error;
pub mod ha;
pub mod sim;

pub use error::RemoteError;
pub use ha::{HaClient, HaSigner, HaStateStore, HaSystemLogSink};
pub use sim::{FileStateStore, SimFile, SimState, SimulatedSigner};
