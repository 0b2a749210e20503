//! Expanded day schedule: document model and the store that loads it.
//!
//! The document is produced by an external expansion step and is read fresh on
//! every cycle, so a regenerated file takes effect on the very next tick.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Floor applied when a slot omits `soc_floor_pct`.
pub const DEFAULT_SOC_FLOOR_PCT: u8 = 15;

/// One time bucket of the day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Slot {
    /// Desired export cap in kW (non-negative).
    pub target_cap_kw: f64,
    /// SOC percentage below which the cap is curtailed.
    pub soc_floor_pct: u8,
}

/// Immutable per-day artifact; index into `slots` is the time-of-day bucket.
///
/// Buckets listed in `rejected` failed validation. Their entry in `slots` is a
/// zero-cap placeholder and `SlotResolver` never hands it out.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleDocument {
    pub day: Option<String>,
    pub slots: Vec<Slot>,
    pub rejected: BTreeMap<usize, String>,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    day: Option<String>,
    #[serde(default)]
    slots: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawSlot {
    #[serde(default)]
    target_cap_kw: Option<f64>,
    #[serde(default)]
    soc_floor_pct: Option<f64>,
}

impl ScheduleDocument {
    /// Parse the JSON artifact. Errors carry a human-readable reason.
    pub fn from_json_str(s: &str, default_soc_floor_pct: u8) -> Result<Self, String> {
        let raw: RawDocument = serde_json::from_str(s).map_err(|e| e.to_string())?;
        let items = match raw.slots {
            Some(serde_json::Value::Array(items)) => items,
            Some(_) => return Err("`slots` is not a sequence".to_string()),
            None => return Err("`slots` is missing".to_string()),
        };

        let mut doc = Self::new(raw.day, Vec::with_capacity(items.len()));
        for (i, item) in items.into_iter().enumerate() {
            match parse_slot(item, default_soc_floor_pct) {
                Ok(slot) => doc.slots.push(slot),
                Err(reason) => {
                    doc.slots.push(Slot {
                        target_cap_kw: 0.0,
                        soc_floor_pct: default_soc_floor_pct,
                    });
                    doc.rejected.insert(i, reason);
                }
            }
        }
        Ok(doc)
    }

    pub fn new(day: Option<String>, slots: Vec<Slot>) -> Self {
        Self {
            day,
            slots,
            rejected: BTreeMap::new(),
        }
    }

    /// Day identifier for log lines ("?" when the document has none).
    pub fn day_label(&self) -> &str {
        self.day.as_deref().unwrap_or("?")
    }
}

fn parse_slot(item: serde_json::Value, default_soc_floor_pct: u8) -> Result<Slot, String> {
    let rs: RawSlot = serde_json::from_value(item).map_err(|e| e.to_string())?;
    let target_cap_kw = rs.target_cap_kw.unwrap_or(0.0);
    if !target_cap_kw.is_finite() || target_cap_kw < 0.0 {
        return Err("target_cap_kw must be a finite value >= 0".to_string());
    }
    let soc_floor_pct = match rs.soc_floor_pct {
        None => default_soc_floor_pct,
        Some(f) if f.is_finite() && (0.0..=100.0).contains(&f) => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let pct = f.trunc() as u8;
            pct
        }
        Some(_) => return Err("soc_floor_pct must be in [0, 100]".to_string()),
    };
    Ok(Slot {
        target_cap_kw,
        soc_floor_pct,
    })
}

/// Source of the current day's schedule.
pub trait ScheduleStore {
    fn load(&self, day: NaiveDate) -> Result<ScheduleDocument, ScheduleError>;
}

impl<T: ScheduleStore + ?Sized> ScheduleStore for Box<T> {
    fn load(&self, day: NaiveDate) -> Result<ScheduleDocument, ScheduleError> {
        (**self).load(day)
    }
}

/// Reads the schedule from a well-known JSON file.
///
/// The path may contain `{day}`, replaced by the requested date (YYYY-MM-DD).
#[derive(Debug, Clone)]
pub struct FileScheduleStore {
    path_template: String,
    default_soc_floor_pct: u8,
    require_matching_day: bool,
}

impl FileScheduleStore {
    pub fn new(path_template: impl Into<String>) -> Self {
        Self {
            path_template: path_template.into(),
            default_soc_floor_pct: DEFAULT_SOC_FLOOR_PCT,
            require_matching_day: false,
        }
    }

    pub fn with_default_soc_floor(mut self, pct: u8) -> Self {
        self.default_soc_floor_pct = pct;
        self
    }

    /// When set, a document whose `day` differs from the requested one is
    /// reported as `NotFound`.
    pub fn require_matching_day(mut self, on: bool) -> Self {
        self.require_matching_day = on;
        self
    }

    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        let day = day.format("%Y-%m-%d").to_string();
        PathBuf::from(self.path_template.replace("{day}", &day))
    }
}

impl ScheduleStore for FileScheduleStore {
    fn load(&self, day: NaiveDate) -> Result<ScheduleDocument, ScheduleError> {
        let path = self.path_for(day);
        let day_str = day.format("%Y-%m-%d").to_string();
        let shown = path.display().to_string();

        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ScheduleError::NotFound {
                    day: day_str,
                    path: shown,
                });
            }
            Err(e) => {
                return Err(ScheduleError::Malformed {
                    path: shown,
                    reason: e.to_string(),
                });
            }
        };

        let doc = ScheduleDocument::from_json_str(&text, self.default_soc_floor_pct)
            .map_err(|reason| ScheduleError::Malformed {
                path: shown.clone(),
                reason,
            })?;

        if self.require_matching_day && doc.day.as_deref() != Some(day_str.as_str()) {
            tracing::debug!(path = %shown, doc_day = doc.day_label(), "schedule is for another day");
            return Err(ScheduleError::NotFound {
                day: day_str,
                path: shown,
            });
        }

        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let doc = ScheduleDocument::from_json_str(
            r#"{"day":"2026-10-19","slots":[{"target_cap_kw":2.5},{"soc_floor_pct":40},{}]}"#,
            15,
        )
        .expect("parse");
        assert_eq!(doc.day_label(), "2026-10-19");
        assert_eq!(
            doc.slots,
            vec![
                Slot { target_cap_kw: 2.5, soc_floor_pct: 15 },
                Slot { target_cap_kw: 0.0, soc_floor_pct: 40 },
                Slot { target_cap_kw: 0.0, soc_floor_pct: 15 },
            ]
        );
    }

    #[test]
    fn slots_must_be_a_sequence() {
        let err = ScheduleDocument::from_json_str(r#"{"slots":{"0":{}}}"#, 15).unwrap_err();
        assert!(err.contains("not a sequence"));
        let err = ScheduleDocument::from_json_str(r#"{"day":"2026-10-19"}"#, 15).unwrap_err();
        assert!(err.contains("missing"));
        let err = ScheduleDocument::from_json_str(r#"{"slots":null}"#, 15).unwrap_err();
        assert!(err.contains("missing"));
    }

    #[test]
    fn bad_slots_are_rejected_individually() {
        let doc = ScheduleDocument::from_json_str(
            r#"{"slots":[{"target_cap_kw":-1},{"target_cap_kw":1.5},{"soc_floor_pct":120},{"target_cap_kw":"high"}]}"#,
            15,
        )
        .expect("parse");
        assert_eq!(doc.slots.len(), 4);
        assert_eq!(doc.rejected.keys().copied().collect::<Vec<_>>(), vec![0, 2, 3]);
        assert!(doc.rejected[&0].contains("target_cap_kw"));
        assert!(doc.rejected[&2].contains("soc_floor_pct"));
        assert_eq!(
            doc.slots[1],
            Slot { target_cap_kw: 1.5, soc_floor_pct: 15 }
        );
    }

    #[test]
    fn fractional_floor_truncates() {
        let doc = ScheduleDocument::from_json_str(r#"{"slots":[{"soc_floor_pct":20.9}]}"#, 15)
            .expect("parse");
        assert_eq!(doc.slots[0].soc_floor_pct, 20);
    }

    #[test]
    fn day_placeholder_expands() {
        let store = FileScheduleStore::new("www/peak_schedule_{day}.json");
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(
            store.path_for(day),
            PathBuf::from("www/peak_schedule_2026-10-19.json")
        );
    }
}
