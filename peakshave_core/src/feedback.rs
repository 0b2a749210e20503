//! Feedback poller: reads a device register through the signer and publishes
//! its value to the state store.
//!
//! Best-effort telemetry. Signer and store failures are logged and reported in
//! the returned `PollOutcome`; only a missing parameter is an `Err`.

use peakshave_traits::{RemoteSigner, StateStore};
use serde_json::{Value, json};

use crate::config::FeedbackCfg;
use crate::error::{ControlError, Result};
use crate::event::{EventEmitter, EventSink};
use crate::remote_error::map_remote_error;

/// Value published after a successful read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackReading {
    pub cid: String,
    pub entity_key: String,
    /// Integer string, `"0"` when the response carried no usable value.
    pub raw_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Published(FeedbackReading),
    /// Read or publish failed; nothing was written.
    Failed { cid: String, reason: String },
}

/// Pull the metric out of `{data: {<metric>: <number|numeric string>}}` as a
/// truncated integer string. Anything else yields `"0"`.
pub fn extract_metric(response: Option<&Value>, metric: &str) -> String {
    let v = response
        .and_then(|r| r.get("data"))
        .and_then(|d| d.get(metric));
    let n = match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n.filter(|x| x.is_finite()) {
        Some(x) => {
            #[allow(clippy::cast_possible_truncation)]
            let whole = x.trunc() as i64;
            whole.to_string()
        }
        None => "0".to_string(),
    }
}

/// `{"cid": <n>}` when the id is numeric, `{"cid": "<id>"}` otherwise.
fn request_payload(cid: &str) -> Value {
    match cid.parse::<u64>() {
        Ok(n) => json!({ "cid": n }),
        Err(_) => json!({ "cid": cid }),
    }
}

fn required<'a>(v: Option<&'a str>) -> Option<&'a str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

pub struct FeedbackPoller {
    signer: Box<dyn RemoteSigner>,
    store: Box<dyn StateStore>,
    cfg: FeedbackCfg,
    emitter: EventEmitter,
}

impl core::fmt::Debug for FeedbackPoller {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FeedbackPoller")
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

impl FeedbackPoller {
    pub fn new(
        signer: impl RemoteSigner + 'static,
        store: impl StateStore + 'static,
        cfg: FeedbackCfg,
    ) -> Self {
        Self {
            signer: Box::new(signer),
            store: Box::new(store),
            cfg,
            emitter: EventEmitter::default(),
        }
    }

    /// Route diagnostics to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.emitter = EventEmitter::new(Box::new(sink));
        self
    }

    pub fn cfg(&self) -> &FeedbackCfg {
        &self.cfg
    }

    /// Read register `cid` and publish it under `destination`.
    pub fn poll(&mut self, cid: Option<&str>, destination: Option<&str>) -> Result<PollOutcome> {
        let Some(cid) = required(cid) else {
            self.emitter.error("poll: missing cid");
            return Err(eyre::Report::new(ControlError::MissingParameter("cid")));
        };
        let Some(destination) = required(destination) else {
            self.emitter.error("poll: missing entity_id");
            return Err(eyre::Report::new(ControlError::MissingParameter("entity_id")));
        };

        self.emitter
            .debug(&format!("polling CID {cid} into {destination}"));

        let payload = request_payload(cid);
        let response = match self.signer.generic_read(&self.cfg.path, &payload) {
            Ok(r) => r,
            Err(e) => {
                let reason = map_remote_error(e.as_ref()).to_string();
                self.emitter
                    .error(&format!("read CID {cid} via {} failed: {reason}", self.cfg.path));
                return Ok(PollOutcome::Failed {
                    cid: cid.to_string(),
                    reason,
                });
            }
        };

        let value = extract_metric(response.as_ref(), &self.cfg.metric);
        self.emitter
            .info(&format!("CID {cid}: {} = {value}", self.cfg.metric));

        if let Err(e) = self.store.set(destination, &value) {
            let reason = map_remote_error(e.as_ref()).to_string();
            self.emitter
                .error(&format!("set {destination} = {value} failed: {reason}"));
            return Ok(PollOutcome::Failed {
                cid: cid.to_string(),
                reason,
            });
        }
        self.emitter.info(&format!("set {destination} = {value}"));

        Ok(PollOutcome::Published(FeedbackReading {
            cid: cid.to_string(),
            entity_key: destination.to_string(),
            raw_value: value,
        }))
    }
}
