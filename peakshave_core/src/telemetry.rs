//! Telemetry read policy: what a missing, stale or garbled value resolves to.
//!
//! A sensor that cannot be read must never block a slot transition, so every
//! failure collapses to a documented default instead of aborting the cycle.

use peakshave_traits::StateStore;

use crate::config::EntityKeys;

/// States that mean "no value".
pub const SENTINELS: [&str; 3] = ["unknown", "unavailable", "none"];

/// SOC used when the sensor is unavailable; forces the low-SOC fallback.
pub const DEFAULT_SOC_PCT: f64 = 0.0;
/// Current limit used when the feedback value is unavailable.
pub const DEFAULT_CURRENT_LIMIT_W: f64 = 0.0;

/// Trim the raw state and drop sentinels and empty strings.
pub fn normalize_state(raw: Option<String>) -> Option<String> {
    let s = raw?;
    let t = s.trim();
    if t.is_empty() || SENTINELS.iter().any(|x| t.eq_ignore_ascii_case(x)) {
        None
    } else {
        Some(t.to_string())
    }
}

fn read_normalized<S: StateStore + ?Sized>(store: &S, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(v) => normalize_state(v),
        Err(e) => {
            tracing::debug!(key, error = %e, "state read failed");
            None
        }
    }
}

/// Numeric state for `key`, or `default` when unreadable, absent, a sentinel,
/// unparsable or non-finite.
pub fn resolve_or_default<S: StateStore + ?Sized>(store: &S, key: &str, default: f64) -> f64 {
    read_normalized(store, key)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// A toggle is on only when its state is exactly "on"; anything else is off.
pub fn read_toggle<S: StateStore + ?Sized>(store: &S, key: &str) -> bool {
    read_normalized(store, key).is_some_and(|s| s.eq_ignore_ascii_case("on"))
}

/// Physical state read at the start of each cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceState {
    pub soc_pct: f64,
    pub current_limit_w: f64,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            soc_pct: DEFAULT_SOC_PCT,
            current_limit_w: DEFAULT_CURRENT_LIMIT_W,
        }
    }
}

impl DeviceState {
    pub fn read<S: StateStore + ?Sized>(store: &S, keys: &EntityKeys) -> Self {
        Self {
            soc_pct: resolve_or_default(store, &keys.soc, DEFAULT_SOC_PCT),
            current_limit_w: resolve_or_default(
                store,
                &keys.current_limit,
                DEFAULT_CURRENT_LIMIT_W,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MemoryStore;

    #[test]
    fn sentinels_and_blanks_are_absent() {
        for s in ["unknown", "Unavailable", " none ", "", "   "] {
            assert_eq!(normalize_state(Some(s.to_string())), None, "{s:?}");
        }
        assert_eq!(normalize_state(Some(" 42 ".to_string())).as_deref(), Some("42"));
        assert_eq!(normalize_state(None), None);
    }

    #[test]
    fn defaults_cover_every_failure_mode() {
        let store = MemoryStore::new()
            .with("sensor.ok", "57.5")
            .with("sensor.sentinel", "unavailable")
            .with("sensor.garbled", "n/a")
            .with("sensor.nan", "NaN");
        assert!((resolve_or_default(&store, "sensor.ok", 0.0) - 57.5).abs() < 1e-12);
        for key in ["sensor.sentinel", "sensor.garbled", "sensor.nan", "sensor.absent"] {
            assert!((resolve_or_default(&store, key, 7.0) - 7.0).abs() < 1e-12, "{key}");
        }
        store.fail_reads(true);
        assert!((resolve_or_default(&store, "sensor.ok", 3.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn toggle_is_on_only_for_on() {
        let store = MemoryStore::new()
            .with("input_boolean.a", "on")
            .with("input_boolean.b", "off")
            .with("input_boolean.c", "unknown");
        assert!(read_toggle(&store, "input_boolean.a"));
        assert!(!read_toggle(&store, "input_boolean.b"));
        assert!(!read_toggle(&store, "input_boolean.c"));
        assert!(!read_toggle(&store, "input_boolean.absent"));
    }
}
