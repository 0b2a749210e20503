//! Wall-clock time → schedule slot.

use chrono::Timelike;

use crate::error::SlotError;
use crate::schedule::{ScheduleDocument, Slot};

/// A slot picked for "now", with its position in the day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSlot {
    pub index: usize,
    pub slot: Slot,
}

/// Maps local wall-clock time to a slot index:
/// `floor((hour * 60 + minute) / granularity_minutes)`.
#[derive(Debug, Clone, Copy)]
pub struct SlotResolver {
    granularity_minutes: u32,
}

impl Default for SlotResolver {
    fn default() -> Self {
        Self::new(15)
    }
}

impl SlotResolver {
    /// Clamps `granularity_minutes` to at least 1.
    pub fn new(granularity_minutes: u32) -> Self {
        Self {
            granularity_minutes: granularity_minutes.max(1),
        }
    }

    pub fn granularity_minutes(&self) -> u32 {
        self.granularity_minutes
    }

    /// Number of buckets a complete document must hold.
    pub fn slots_per_day(&self) -> usize {
        (peakshave_config::MINUTES_PER_DAY / self.granularity_minutes) as usize
    }

    #[allow(clippy::integer_division)]
    pub fn slot_index<T: Timelike>(&self, now: &T) -> usize {
        let minutes = now.hour() * 60 + now.minute();
        (minutes / self.granularity_minutes) as usize
    }

    pub fn resolve<T: Timelike>(
        &self,
        now: &T,
        doc: &ScheduleDocument,
    ) -> Result<ResolvedSlot, SlotError> {
        let index = self.slot_index(now);
        if let Some(reason) = doc.rejected.get(&index) {
            return Err(SlotError::Rejected {
                index,
                reason: reason.clone(),
            });
        }
        doc.slots
            .get(index)
            .map(|slot| ResolvedSlot { index, slot: *slot })
            .ok_or(SlotError::OutOfRange {
                index,
                len: doc.slots.len(),
            })
    }
}
