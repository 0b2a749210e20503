//! Home Assistant REST backend.
//!
//! One blocking client shared by three adapters: the state store, the signer
//! service proxy and the `system_log` event mirror.

use std::time::Duration;

use peakshave_core::event::{EventSink, Severity, SlotEvent};
use peakshave_traits::{BoxError, RemoteSigner, StateStore};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{RemoteError, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8123";

#[derive(Debug, Deserialize)]
struct EntityState {
    state: String,
}

/// Home Assistant REST API client.
#[derive(Debug, Clone)]
pub struct HaClient {
    base_url: String,
    token: String,
    http: Client,
}

impl HaClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Config(format!("failed to build HTTP client: {e}")))?;
        let base_url: String = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            http,
        })
    }

    /// Config values first, then `HA_BASE_URL` / `HA_TOKEN`.
    pub fn from_config(
        base_url: Option<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url
            .or_else(|| std::env::var("HA_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let token = token
            .or_else(|| std::env::var("HA_TOKEN").ok())
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                RemoteError::Config(
                    "token not found in config or HA_TOKEN environment variable".to_string(),
                )
            })?;
        debug!(%base_url, "home assistant client");
        Self::new(base_url, token, timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check(resp: Response, what: &str) -> Result<Response> {
        match resp.status() {
            s if s.is_success() => Ok(resp),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::Auth),
            StatusCode::NOT_FOUND => Err(RemoteError::NotFound(what.to_string())),
            s => Err(RemoteError::Api {
                status: s.as_u16(),
                message: resp.text().unwrap_or_default(),
            }),
        }
    }

    /// Raw state of `entity_id`; `None` when the entity does not exist.
    pub fn get_state(&self, entity_id: &str) -> Result<Option<String>> {
        let resp = self
            .http
            .get(self.url(&format!("/api/states/{entity_id}")))
            .bearer_auth(&self.token)
            .send()?;
        match Self::check(resp, entity_id) {
            Ok(resp) => {
                let st: EntityState = resp.json()?;
                debug!(entity_id, state = %st.state, "state read");
                Ok(Some(st.state))
            }
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Overwrite the state of an arbitrary entity.
    pub fn post_state(&self, entity_id: &str, state: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.url(&format!("/api/states/{entity_id}")))
            .bearer_auth(&self.token)
            .json(&json!({ "state": state }))
            .send()?;
        Self::check(resp, entity_id)?;
        Ok(())
    }

    pub fn call_service(&self, domain: &str, service: &str, data: &Value) -> Result<()> {
        let what = format!("{domain}.{service}");
        let resp = self
            .http
            .post(self.url(&format!("/api/services/{domain}/{service}")))
            .bearer_auth(&self.token)
            .json(data)
            .send()?;
        Self::check(resp, &what)?;
        debug!(service = %what, "service called");
        Ok(())
    }

    /// Call a service that answers with data; returns its `service_response`.
    pub fn call_service_with_response(
        &self,
        domain: &str,
        service: &str,
        data: &Value,
    ) -> Result<Option<Value>> {
        let what = format!("{domain}.{service}");
        let resp = self
            .http
            .post(self.url(&format!("/api/services/{domain}/{service}?return_response")))
            .bearer_auth(&self.token)
            .json(data)
            .send()?;
        let body: Value = Self::check(resp, &what)?.json()?;
        Ok(body
            .get("service_response")
            .filter(|v| !v.is_null())
            .cloned())
    }

    /// `GET /api/`: succeeds when the API is reachable and the token accepted.
    pub fn ping(&self) -> Result<()> {
        let resp = self
            .http
            .get(self.url("/api/"))
            .bearer_auth(&self.token)
            .send()?;
        Self::check(resp, "/api/")?;
        Ok(())
    }
}

/// `StateStore` over entity states.
#[derive(Debug, Clone)]
pub struct HaStateStore {
    client: HaClient,
}

impl HaStateStore {
    pub fn new(client: HaClient) -> Self {
        Self { client }
    }
}

impl StateStore for HaStateStore {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, BoxError> {
        Ok(self.client.get_state(key)?)
    }

    /// Helpers are written through their services so HA keeps them
    /// consistent; other entities get their state overwritten.
    fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), BoxError> {
        let data = match key.split_once('.') {
            Some(("input_text", _)) => {
                Some(("input_text", json!({ "entity_id": key, "value": value })))
            }
            Some(("input_number", _)) => {
                let n: f64 = value.trim().parse().map_err(|_| {
                    RemoteError::Config(format!("{key} needs a numeric value, got {value:?}"))
                })?;
                Some(("input_number", json!({ "entity_id": key, "value": n })))
            }
            _ => None,
        };
        match data {
            Some((domain, body)) => self.client.call_service(domain, "set_value", &body)?,
            None => self.client.post_state(key, value)?,
        }
        Ok(())
    }
}

/// `RemoteSigner` proxied through the signer integration's HA services.
#[derive(Debug, Clone)]
pub struct HaSigner {
    client: HaClient,
    domain: String,
    set_limit_service: String,
    read_service: String,
}

impl HaSigner {
    pub fn new(
        client: HaClient,
        domain: impl Into<String>,
        set_limit_service: impl Into<String>,
        read_service: impl Into<String>,
    ) -> Self {
        Self {
            client,
            domain: domain.into(),
            set_limit_service: set_limit_service.into(),
            read_service: read_service.into(),
        }
    }
}

impl RemoteSigner for HaSigner {
    fn set_grid_power_limit(
        &mut self,
        watts: i64,
        threshold_w: i64,
    ) -> std::result::Result<(), BoxError> {
        self.client.call_service(
            &self.domain,
            &self.set_limit_service,
            &json!({ "watts": watts, "threshold_w": threshold_w }),
        )?;
        Ok(())
    }

    fn generic_read(
        &mut self,
        path: &str,
        payload: &Value,
    ) -> std::result::Result<Option<Value>, BoxError> {
        Ok(self.client.call_service_with_response(
            &self.domain,
            &self.read_service,
            &json!({ "path": path, "payload": payload }),
        )?)
    }
}

/// Mirrors slot events (and warnings/errors) into the HA system log.
#[derive(Debug, Clone)]
pub struct HaSystemLogSink {
    client: HaClient,
    min_log_severity: Severity,
}

impl HaSystemLogSink {
    pub fn new(client: HaClient) -> Self {
        Self {
            client,
            min_log_severity: Severity::Warn,
        }
    }

    pub fn with_min_log_severity(mut self, s: Severity) -> Self {
        self.min_log_severity = s;
        self
    }

    fn write(&self, level: Severity, message: &str) {
        let body = json!({ "level": level.as_str(), "message": message });
        if let Err(e) = self.client.call_service("system_log", "write", &body) {
            warn!(error = %e, "system_log.write failed");
        }
    }
}

impl EventSink for HaSystemLogSink {
    fn emit(&mut self, event: &SlotEvent) {
        self.write(event.severity(), &format!("schedule_slot {}", event.to_json()));
    }

    fn log(&mut self, severity: Severity, message: &str) {
        if severity >= self.min_log_severity {
            self.write(severity, message);
        }
    }
}
