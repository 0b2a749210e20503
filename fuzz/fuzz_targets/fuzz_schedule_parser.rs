#![no_main]
use libfuzzer_sys::fuzz_target;
use peakshave_core::{ScheduleDocument, SlotResolver};

fuzz_target!(|input: (&str, u8, u16)| {
    let (text, floor, minute) = input;
    let Ok(doc) = ScheduleDocument::from_json_str(text, floor.min(100)) else {
        return;
    };
    for slot in &doc.slots {
        assert!(slot.soc_floor_pct <= 100);
        assert!(slot.target_cap_kw.is_finite());
    }
    assert!(doc.rejected.keys().all(|&i| i < doc.slots.len()));
    // Resolution never panics, whatever the slot count.
    let now = chrono::NaiveTime::from_num_seconds_from_midnight_opt(
        u32::from(minute % 1440) * 60,
        0,
    );
    if let Some(now) = now {
        let _ = SlotResolver::new(15).resolve(&now, &doc);
    }
});
