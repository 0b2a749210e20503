//! In-memory fakes for the capability traits.
//!
//! Every fake is a cheap handle over shared state: clone it, hand one copy to
//! the dispatcher or poller, keep the other to inspect what happened.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use peakshave_traits::{BoxError, RemoteSigner, StateStore};
use serde_json::Value;

use crate::error::ScheduleError;
use crate::event::{EventSink, Severity, SlotEvent};
use crate::schedule::{ScheduleDocument, ScheduleStore, Slot};

pub use peakshave_traits::FixedClock;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Key/value state store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        lock(&self.values).insert(key.to_string(), value.to_string());
        self
    }

    pub fn value(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    /// Make every `get` return an error.
    pub fn fail_reads(&self, on: bool) {
        self.fail_reads.store(on, Ordering::Relaxed);
    }

    /// Make every `set` return an error.
    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::Relaxed);
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(Box::new(std::io::Error::other("state store unreachable")));
        }
        Ok(self.value(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), BoxError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(Box::new(std::io::Error::other("state store rejected write")));
        }
        lock(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SignerLog {
    set_calls: Vec<(i64, i64)>,
    reads: Vec<(String, Value)>,
}

/// Signer that records every call and answers reads with a canned response.
#[derive(Debug, Clone, Default)]
pub struct RecordingSigner {
    log: Arc<Mutex<SignerLog>>,
    response: Option<Value>,
    failing: bool,
}

impl RecordingSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every `generic_read` with `response`.
    pub fn responding(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    /// Fail every call with a transport error (calls are still recorded).
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// `(watts, threshold_w)` for each `set_grid_power_limit`.
    pub fn set_calls(&self) -> Vec<(i64, i64)> {
        lock(&self.log).set_calls.clone()
    }

    /// `(path, payload)` for each `generic_read`.
    pub fn reads(&self) -> Vec<(String, Value)> {
        lock(&self.log).reads.clone()
    }
}

impl RemoteSigner for RecordingSigner {
    fn set_grid_power_limit(&mut self, watts: i64, threshold_w: i64) -> Result<(), BoxError> {
        lock(&self.log).set_calls.push((watts, threshold_w));
        if self.failing {
            return Err(Box::new(std::io::Error::other("signer unreachable")));
        }
        Ok(())
    }

    fn generic_read(&mut self, path: &str, payload: &Value) -> Result<Option<Value>, BoxError> {
        lock(&self.log)
            .reads
            .push((path.to_string(), payload.clone()));
        if self.failing {
            return Err(Box::new(std::io::Error::other("signer unreachable")));
        }
        Ok(self.response.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Event(SlotEvent),
    Log(Severity, String),
}

/// Sink capturing events and diagnostics in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<Record>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Record> {
        lock(&self.records).clone()
    }

    pub fn events(&self) -> Vec<SlotEvent> {
        lock(&self.records)
            .iter()
            .filter_map(|r| match r {
                Record::Event(e) => Some(e.clone()),
                Record::Log(..) => None,
            })
            .collect()
    }

    pub fn logs(&self) -> Vec<(Severity, String)> {
        lock(&self.records)
            .iter()
            .filter_map(|r| match r {
                Record::Log(s, m) => Some((*s, m.clone())),
                Record::Event(_) => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &SlotEvent) {
        lock(&self.records).push(Record::Event(event.clone()));
    }

    fn log(&mut self, severity: Severity, message: &str) {
        lock(&self.records).push(Record::Log(severity, message.to_string()));
    }
}

/// Schedule store returning the same document (or error) for every day.
#[derive(Debug, Clone)]
pub struct StaticSchedule {
    doc: Result<ScheduleDocument, ScheduleError>,
}

impl StaticSchedule {
    pub fn new(doc: ScheduleDocument) -> Self {
        Self { doc: Ok(doc) }
    }

    /// `n` identical slots.
    pub fn uniform(n: usize, target_cap_kw: f64, soc_floor_pct: u8) -> Self {
        Self::new(ScheduleDocument::new(
            None,
            vec![
                Slot {
                    target_cap_kw,
                    soc_floor_pct,
                };
                n
            ],
        ))
    }

    /// Replace slot `index`; ignored when out of range or the store is failing.
    pub fn with_slot(mut self, index: usize, slot: Slot) -> Self {
        if let Ok(doc) = self.doc.as_mut()
            && let Some(s) = doc.slots.get_mut(index)
        {
            *s = slot;
        }
        self
    }

    /// Every load reports the file as missing.
    pub fn missing() -> Self {
        Self {
            doc: Err(ScheduleError::NotFound {
                day: "?".to_string(),
                path: "<memory>".to_string(),
            }),
        }
    }
}

impl ScheduleStore for StaticSchedule {
    fn load(&self, day: NaiveDate) -> Result<ScheduleDocument, ScheduleError> {
        match &self.doc {
            Ok(doc) => Ok(doc.clone()),
            Err(ScheduleError::NotFound { path, .. }) => Err(ScheduleError::NotFound {
                day: day.format("%Y-%m-%d").to_string(),
                path: path.clone(),
            }),
            Err(e) => Err(e.clone()),
        }
    }
}
