//! Offline backend backed by one JSON file.
//!
//! ```json
//! { "states": { "sensor.battery_soc": "55" }, "registers": { "5035": 3000 } }
//! ```
//!
//! The signer writes applied limits into `registers` and answers reads from
//! it, so a dispatch followed by a poll closes the feedback loop locally.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use peakshave_traits::{BoxError, RemoteSigner, StateStore};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{RemoteError, Result};

/// When set to `1`, every simulated signer call fails.
pub const FAIL_ENV: &str = "PEAKSHAVE_SIM_SIGNER_FAIL";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    #[serde(default)]
    pub states: BTreeMap<String, String>,
    #[serde(default)]
    pub registers: BTreeMap<String, Value>,
}

/// Handle on the state file. A missing file reads as empty.
#[derive(Debug, Clone)]
pub struct SimFile {
    path: PathBuf,
}

impl SimFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<SimState> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(SimState::default()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SimState::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write via a sibling temp file and rename, so readers never see half a
    /// document.
    pub fn save(&self, state: &SimState) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn update<F: FnOnce(&mut SimState)>(&self, f: F) -> Result<()> {
        let mut st = self.load()?;
        f(&mut st);
        self.save(&st)
    }
}

#[derive(Debug, Clone)]
pub struct FileStateStore {
    file: SimFile,
}

impl FileStateStore {
    pub fn new(file: SimFile) -> Self {
        Self { file }
    }
}

impl StateStore for FileStateStore {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, BoxError> {
        Ok(self.file.load()?.states.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), BoxError> {
        self.file.update(|st| {
            st.states.insert(key.to_string(), value.to_string());
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedSigner {
    file: SimFile,
    limit_cid: String,
    metric: String,
}

impl SimulatedSigner {
    pub fn new(file: SimFile, limit_cid: impl Into<String>) -> Self {
        Self {
            file,
            limit_cid: limit_cid.into(),
            metric: "yuanzhi".to_string(),
        }
    }

    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = metric.into();
        self
    }

    fn check_fail() -> Result<()> {
        if std::env::var(FAIL_ENV).is_ok_and(|v| v.trim() == "1") {
            return Err(RemoteError::Simulated(format!("{FAIL_ENV}=1")));
        }
        Ok(())
    }
}

fn cid_key(payload: &Value) -> Option<String> {
    match payload.get("cid")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl RemoteSigner for SimulatedSigner {
    fn set_grid_power_limit(
        &mut self,
        watts: i64,
        threshold_w: i64,
    ) -> std::result::Result<(), BoxError> {
        Self::check_fail()?;
        tracing::info!(watts, threshold_w, cid = %self.limit_cid, "simulated limit write");
        self.file.update(|st| {
            st.registers.insert(self.limit_cid.clone(), json!(watts));
        })?;
        Ok(())
    }

    fn generic_read(
        &mut self,
        path: &str,
        payload: &Value,
    ) -> std::result::Result<Option<Value>, BoxError> {
        Self::check_fail()?;
        let Some(cid) = cid_key(payload) else {
            return Err(Box::new(RemoteError::Simulated(format!(
                "{path}: payload has no cid"
            ))));
        };
        let st = self.file.load()?;
        let mut data = serde_json::Map::new();
        if let Some(v) = st.registers.get(&cid) {
            data.insert(self.metric.clone(), v.clone());
        }
        Ok(Some(json!({ "data": data })))
    }
}
