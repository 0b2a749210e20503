use chrono::{FixedOffset, NaiveTime, TimeZone};
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use peakshave_core::mocks::{MemoryStore, RecordingSigner, RecordingSink, StaticSchedule};
use peakshave_core::{CapCalculator, DeviceState, Dispatcher, ScheduleDocument, Slot};
use peakshave_traits::FixedClock;

fn day_doc() -> ScheduleDocument {
    ScheduleDocument::new(
        None,
        (0..96)
            .map(|i| Slot {
                target_cap_kw: f64::from(i % 12) * 0.5,
                soc_floor_pct: 20,
            })
            .collect(),
    )
}

pub fn bench_cycle(c: &mut Criterion) {
    let mut g = c.benchmark_group("cycle");
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p peakshave_core --bench cycle
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    let doc = day_doc();
    let calc = CapCalculator::default();
    let state = DeviceState {
        soc_pct: 42.0,
        current_limit_w: 2_400.0,
    };
    let times: Vec<NaiveTime> = (0..1440)
        .map(|m| NaiveTime::from_hms_opt(m / 60, m % 60, 0).unwrap())
        .collect();

    g.bench_function("compute_full_day", |b| {
        b.iter(|| {
            for t in &times {
                let c = calc.compute(black_box(t), black_box(&doc), black_box(&state));
                black_box(c.ok());
            }
        });
    });

    let at = FixedOffset::east_opt(0)
        .unwrap()
        .with_ymd_and_hms(2026, 10, 19, 17, 30, 0)
        .unwrap();

    g.bench_function("run_cycle_mocks", |b| {
        b.iter_batched(
            || {
                let store = MemoryStore::new()
                    .with("sensor.battery_soc", "55")
                    .with("sensor.solis_peak_shaving_power_limit", "1000");
                Dispatcher::builder()
                    .with_schedule(StaticSchedule::new(doc.clone()))
                    .with_store(store)
                    .with_signer(RecordingSigner::new())
                    .with_sink(RecordingSink::new())
                    .with_clock(FixedClock::new(at))
                    .try_build()
                    .unwrap()
            },
            |mut d| {
                black_box(d.run_cycle().ok());
            },
            BatchSize::SmallInput,
        );
    });
    g.finish();
}

criterion_group!(cycle, bench_cycle);
criterion_main!(cycle);
