//! Unit conversion helpers.

/// Watts in one kilowatt.
pub const WATTS_PER_KW: f64 = 1_000.0;

/// Round a watt value to a whole watt, half-to-even, saturating to the `i64`
/// range. Non-finite values (NaN/±Inf) map to 0.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn round_watts(w: f64) -> i64 {
    if !w.is_finite() {
        return 0;
    }
    let r = w.round_ties_even();
    if r >= i64::MAX as f64 {
        i64::MAX
    } else if r <= i64::MIN as f64 {
        i64::MIN
    } else {
        r as i64
    }
}

/// Convert a cap in kW to whole watts using [`round_watts`].
#[inline]
pub fn kw_to_w(kw: f64) -> i64 {
    round_watts(kw * WATTS_PER_KW)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_go_to_even() {
        assert_eq!(round_watts(2.5), 2);
        assert_eq!(round_watts(3.5), 4);
        assert_eq!(round_watts(-2.5), -2);
        assert_eq!(round_watts(2999.6), 3000);
        assert_eq!(round_watts(2970.4), 2970);
    }

    #[test]
    fn kw_values_convert_to_nearest_watt() {
        assert_eq!(kw_to_w(2.345), 2345);
        assert_eq!(kw_to_w(3.0), 3000);
        assert_eq!(kw_to_w(0.3), 300);
        assert_eq!(kw_to_w(0.0), 0);
    }

    #[test]
    fn non_finite_and_huge_values_are_clamped() {
        assert_eq!(round_watts(f64::NAN), 0);
        assert_eq!(round_watts(f64::INFINITY), 0);
        assert_eq!(round_watts(1e30), i64::MAX);
        assert_eq!(round_watts(-1e30), i64::MIN);
    }
}
