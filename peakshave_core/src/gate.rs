//! Hysteresis gate suppressing sub-threshold writes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Skip,
    Proceed,
}

/// Skip when `|delta_w| < threshold_w`.
#[inline]
pub fn decide(delta_w: i64, threshold_w: u64) -> GateVerdict {
    if delta_w.unsigned_abs() < threshold_w {
        GateVerdict::Skip
    } else {
        GateVerdict::Proceed
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeltaGate {
    threshold_w: u64,
}

impl Default for DeltaGate {
    fn default() -> Self {
        Self::new(50)
    }
}

impl DeltaGate {
    pub fn new(threshold_w: u64) -> Self {
        Self { threshold_w }
    }

    pub fn threshold_w(&self) -> u64 {
        self.threshold_w
    }

    pub fn decide(&self, delta_w: i64) -> GateVerdict {
        decide(delta_w, self.threshold_w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_inclusive_of_threshold() {
        let g = DeltaGate::default();
        assert_eq!(g.decide(49), GateVerdict::Skip);
        assert_eq!(g.decide(-49), GateVerdict::Skip);
        assert_eq!(g.decide(50), GateVerdict::Proceed);
        assert_eq!(g.decide(-50), GateVerdict::Proceed);
        assert_eq!(g.decide(0), GateVerdict::Skip);
    }

    #[test]
    fn extreme_deltas_do_not_overflow() {
        assert_eq!(decide(i64::MIN, 50), GateVerdict::Proceed);
        assert_eq!(decide(i64::MAX, u64::MAX), GateVerdict::Skip);
    }
}
