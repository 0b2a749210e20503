//! SOC-floor fallback policy.

/// Curtails the slot's cap while the battery sits below the slot's SOC floor.
#[derive(Debug, Clone, Copy)]
pub struct SocGuard {
    fallback_low_soc_kw: f64,
}

impl Default for SocGuard {
    fn default() -> Self {
        Self::new(0.3)
    }
}

impl SocGuard {
    pub fn new(fallback_low_soc_kw: f64) -> Self {
        Self {
            fallback_low_soc_kw,
        }
    }

    pub fn fallback_low_soc_kw(&self) -> f64 {
        self.fallback_low_soc_kw
    }

    /// True when `soc_pct` is strictly below the floor.
    #[inline]
    pub fn is_low(soc_pct: f64, soc_floor_pct: u8) -> bool {
        soc_pct < f64::from(soc_floor_pct)
    }

    /// Effective cap in kW. Total: never fails, never raises the target.
    pub fn apply(&self, target_cap_kw: f64, soc_pct: f64, soc_floor_pct: u8) -> f64 {
        if Self::is_low(soc_pct, soc_floor_pct) {
            target_cap_kw.min(self.fallback_low_soc_kw)
        } else {
            target_cap_kw
        }
    }
}
