//! Dry-run cycle example
//!
//! Builds a dispatcher over in-memory fakes, runs one cycle with the dry-run
//! toggle on and one with it off, then polls the feedback register.
//!
//! Run with `cargo run -p peakshave_core --example dry_run_cycle`.

use peakshave_core::mocks::{MemoryStore, RecordingSigner, RecordingSink, StaticSchedule};
use peakshave_core::{Dispatcher, FeedbackCfg, FeedbackPoller, PollOutcome, Slot};
use serde_json::json;

fn main() -> Result<(), eyre::Report> {
    let store = MemoryStore::new()
        .with("sensor.battery_soc", "64")
        .with("sensor.solis_peak_shaving_power_limit", "1800")
        .with("input_boolean.schedule_dry_run", "on");
    let signer = RecordingSigner::new().responding(json!({"data": {"yuanzhi": "3500.0"}}));

    // Evening peak: 3.5 kW from 17:00, 1 kW otherwise.
    let mut schedule = StaticSchedule::uniform(96, 1.0, 20);
    for i in 68..84 {
        schedule = schedule.with_slot(
            i,
            Slot {
                target_cap_kw: 3.5,
                soc_floor_pct: 30,
            },
        );
    }

    let sink = RecordingSink::new();
    let mut dispatcher = Dispatcher::builder()
        .with_schedule(schedule)
        .with_store(store.clone())
        .with_signer(signer.clone())
        .with_sink(sink.clone())
        .try_build()?;

    let out = dispatcher.run_cycle()?;
    println!("dry-run cycle: {}", out.name());

    let mut live = store.clone();
    peakshave_traits::StateStore::set(&mut live, "input_boolean.schedule_dry_run", "off")
        .map_err(|e| eyre::eyre!("{e}"))?;
    let out = dispatcher.run_cycle()?;
    println!("live cycle: {} (signer calls: {:?})", out.name(), signer.set_calls());

    for e in sink.events() {
        println!("  {}", e.summary());
    }

    let mut poller = FeedbackPoller::new(signer, store.clone(), FeedbackCfg::default());
    if let PollOutcome::Published(r) =
        poller.poll(Some("5035"), Some("sensor.solis_peak_shaving_power_limit"))?
    {
        println!("feedback: {} = {}", r.entity_key, r.raw_value);
    }
    Ok(())
}
