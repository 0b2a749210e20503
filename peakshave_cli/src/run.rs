//! Backend assembly from config and the per-command entry points.

use std::path::Path;
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use eyre::{Result, WrapErr};
use peakshave_config::{BackendMode, Config};
use peakshave_core::remote_error::map_remote_error;
use peakshave_core::{
    ControlCfg, ControlError, CycleOutcome, DispatchDecision, Dispatcher, EntityKeys, EventSink,
    FeedbackCfg, FeedbackPoller, FileScheduleStore, Outcome, PollOutcome, ScheduleStore,
    TracingSink,
};
use peakshave_remote::{
    FileStateStore, HaClient, HaSigner, HaStateStore, HaSystemLogSink, SimFile, SimulatedSigner,
};
use peakshave_traits::{Clock, RemoteSigner, StateStore, SystemClock};
use serde_json::{Value, json};

use crate::cli::json_mode;

/// Read and validate the config file; every failure here is a config error.
pub fn load_config(path: &Path) -> Result<Config> {
    peakshave_config::load_file(path).map_err(|e| ControlError::Config(format!("{e:#}")).into())
}

/// Where the capability traits are served from.
pub enum Backend {
    HomeAssistant(HaClient),
    Simulated(SimFile),
}

impl Backend {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        match cfg.backend.mode {
            BackendMode::HomeAssistant => {
                let client = HaClient::from_config(
                    cfg.backend.base_url.clone(),
                    cfg.backend.token.clone(),
                    Duration::from_millis(cfg.backend.timeout_ms),
                )
                .map_err(|e| ControlError::Config(format!("backend: {e}")))?;
                Ok(Self::HomeAssistant(client))
            }
            BackendMode::Simulated => Ok(Self::Simulated(SimFile::new(&cfg.backend.state_file))),
        }
    }

    pub fn store(&self) -> Box<dyn StateStore> {
        match self {
            Self::HomeAssistant(c) => Box::new(HaStateStore::new(c.clone())),
            Self::Simulated(f) => Box::new(FileStateStore::new(f.clone())),
        }
    }

    pub fn signer(&self, cfg: &Config) -> Box<dyn RemoteSigner> {
        match self {
            Self::HomeAssistant(c) => Box::new(HaSigner::new(
                c.clone(),
                &cfg.signer.domain,
                &cfg.signer.set_limit_service,
                &cfg.signer.read_service,
            )),
            Self::Simulated(f) => Box::new(
                SimulatedSigner::new(f.clone(), &cfg.backend.limit_cid)
                    .with_metric(&cfg.feedback.metric),
            ),
        }
    }

    /// Tracing always; the HA system log as well when mirroring is on.
    pub fn sink(&self, cfg: &Config) -> Box<dyn EventSink> {
        match self {
            Self::HomeAssistant(c) if cfg.logging.mirror_to_system_log => {
                Box::new((TracingSink, HaSystemLogSink::new(c.clone())))
            }
            _ => Box::new(TracingSink),
        }
    }
}

pub fn build_dispatcher(cfg: &Config, backend: &Backend) -> Result<Dispatcher> {
    Dispatcher::builder()
        .with_schedule(FileScheduleStore::from(cfg))
        .with_store(backend.store())
        .with_signer(backend.signer(cfg))
        .with_sink(backend.sink(cfg))
        .with_clock(SystemClock::new())
        .with_control(ControlCfg::from(cfg))
        .with_entities(EntityKeys::from(&cfg.entities))
        .try_build()
}

pub fn build_poller(cfg: &Config, backend: &Backend) -> FeedbackPoller {
    FeedbackPoller::new(
        backend.signer(cfg),
        backend.store(),
        FeedbackCfg::from(&cfg.feedback),
    )
    .with_sink(backend.sink(cfg))
}

// ── Rendering ────────────────────────────────────────────────────────────────

fn decision_line(d: &DispatchDecision) -> String {
    format!(
        "slot {} -> {} W (current {} W, delta {:+} W, soc {:.1}%, floor {}%, cap {:.3}/{:.3} kW)",
        d.slot_index,
        d.requested_w,
        d.current_w,
        d.delta_w,
        d.soc_pct,
        d.soc_floor_pct,
        d.effective_cap_kw,
        d.target_cap_kw,
    )
}

/// One-line human summary of a cycle.
pub fn outcome_line(out: &CycleOutcome) -> String {
    match out {
        CycleOutcome::LoadFailed(e) => format!("load_failed: {e}"),
        CycleOutcome::SlotInvalid { day, error } => format!(
            "slot_invalid: day={} {error}",
            day.as_deref().unwrap_or("?")
        ),
        CycleOutcome::Skipped(d) | CycleOutcome::Simulated(d) | CycleOutcome::Applied(d) => {
            format!("{}: {}", out.name(), decision_line(d))
        }
    }
}

pub fn outcome_json(command: &str, out: &CycleOutcome) -> Value {
    let mut v = json!({ "command": command, "outcome": out.name() });
    match out {
        CycleOutcome::LoadFailed(e) => v["reason"] = json!(e.to_string()),
        CycleOutcome::SlotInvalid { day, error } => {
            v["day"] = json!(day);
            v["reason"] = json!(error.to_string());
        }
        CycleOutcome::Skipped(_) | CycleOutcome::Simulated(_) | CycleOutcome::Applied(_) => {}
    }
    if let Some(d) = out.decision() {
        v["decision"] = serde_json::to_value(d).unwrap_or(Value::Null);
    }
    v
}

fn print_outcome(command: &str, out: &CycleOutcome) {
    if json_mode() {
        println!("{}", outcome_json(command, out));
    } else {
        println!("{}", outcome_line(out));
    }
}

// ── Entry points ─────────────────────────────────────────────────────────────

pub fn dispatch(cfg: &Config) -> Result<()> {
    let backend = Backend::from_config(cfg)?;
    let mut dispatcher = build_dispatcher(cfg, &backend)?;
    let out = dispatcher.run_cycle().wrap_err("dispatch cycle")?;
    print_outcome("dispatch", &out);
    Ok(())
}

pub fn status(cfg: &Config) -> Result<()> {
    let backend = Backend::from_config(cfg)?;
    let dispatcher = build_dispatcher(cfg, &backend)?;
    let out = dispatcher.preview();
    if json_mode() {
        let mut v = outcome_json("status", &out);
        v["threshold_w"] = json!(dispatcher.threshold_w());
        v["granularity_minutes"] = json!(dispatcher.granularity_minutes());
        println!("{v}");
    } else {
        let verdict = match out.decision().map(|d| d.outcome) {
            Some(Outcome::Applied) => " (would apply)",
            Some(Outcome::Simulated) => " (dry-run)",
            Some(Outcome::SkipThreshold) => " (below threshold)",
            None => "",
        };
        println!(
            "{}{verdict} [threshold {} W, {} min slots]",
            outcome_line(&out),
            dispatcher.threshold_w(),
            dispatcher.granularity_minutes()
        );
    }
    Ok(())
}

fn resolve_poll_args<'a>(
    cfg: &'a Config,
    cid: Option<&'a str>,
    entity_id: Option<&'a str>,
) -> (Option<&'a str>, Option<&'a str>) {
    (
        cid.or(cfg.feedback.cid.as_deref()),
        entity_id.or(cfg.feedback.entity_id.as_deref()),
    )
}

pub fn poll(cfg: &Config, cid: Option<&str>, entity_id: Option<&str>) -> Result<()> {
    let backend = Backend::from_config(cfg)?;
    let mut poller = build_poller(cfg, &backend);
    let (cid, entity_id) = resolve_poll_args(cfg, cid, entity_id);
    match poller.poll(cid, entity_id)? {
        PollOutcome::Published(r) => {
            if json_mode() {
                println!(
                    "{}",
                    json!({
                        "command": "poll",
                        "outcome": "published",
                        "cid": r.cid,
                        "entity_id": r.entity_key,
                        "value": r.raw_value,
                    })
                );
            } else {
                println!("published: CID {} -> {} = {}", r.cid, r.entity_key, r.raw_value);
            }
            Ok(())
        }
        PollOutcome::Failed { cid, reason } => Err(eyre::Report::new(ControlError::Transport(
            reason,
        ))
        .wrap_err(format!("poll CID {cid}"))),
    }
}

pub fn self_check(cfg: &Config) -> Result<()> {
    let report = |what: &str, detail: &str| {
        if json_mode() {
            println!(
                "{}",
                json!({ "command": "self-check", "check": what, "ok": true, "detail": detail })
            );
        } else {
            println!("ok: {what} ({detail})");
        }
    };

    report("config", "parsed and validated");

    let store = FileScheduleStore::from(cfg);
    let today = SystemClock::new().now().date_naive();
    let doc = store
        .load(today)
        .map_err(ControlError::from)
        .wrap_err("load today's schedule")?;
    report(
        "schedule",
        &format!(
            "{}: day={} slots={} rejected={}",
            store.path_for(today).display(),
            doc.day.as_deref().unwrap_or("?"),
            doc.slots.len(),
            doc.rejected.len()
        ),
    );
    for (index, reason) in &doc.rejected {
        tracing::warn!(slot = index, %reason, "schedule slot rejected");
    }

    match Backend::from_config(cfg)? {
        Backend::HomeAssistant(client) => {
            client
                .ping()
                .map_err(|e| map_remote_error(&e))
                .wrap_err("reach Home Assistant")?;
            report("backend", client.base_url());
        }
        Backend::Simulated(file) => {
            let st = file
                .load()
                .map_err(|e| ControlError::Config(format!("state file: {e}")))?;
            report(
                "backend",
                &format!(
                    "simulated {}: {} states, {} registers",
                    file.path().display(),
                    st.states.len(),
                    st.registers.len()
                ),
            );
        }
    }
    Ok(())
}

// ── Trigger loop ─────────────────────────────────────────────────────────────

/// Serve both tickers from the calling thread until `stop` fires or
/// disconnects. A slow handler delays the next tick instead of overlapping it.
pub fn drive(
    dispatch_tick: &xch::Receiver<Instant>,
    poll_tick: &xch::Receiver<Instant>,
    stop: &xch::Receiver<()>,
    mut on_dispatch: impl FnMut(),
    mut on_poll: impl FnMut(),
) {
    loop {
        xch::select! {
            recv(stop) -> _ => break,
            recv(dispatch_tick) -> _ => on_dispatch(),
            recv(poll_tick) -> _ => on_poll(),
        }
    }
}

pub fn watch(cfg: &Config, poll_every: u64, dispatch_every: u64) -> Result<()> {
    if poll_every == 0 || dispatch_every == 0 {
        return Err(ControlError::Config(
            "--poll-every and --dispatch-every must be >= 1 second".to_string(),
        )
        .into());
    }
    let backend = Backend::from_config(cfg)?;
    let mut dispatcher = build_dispatcher(cfg, &backend)?;
    let mut poller = build_poller(cfg, &backend);

    let (cid, entity_id) = resolve_poll_args(cfg, None, None);
    let poll_tick = if cid.is_some() && entity_id.is_some() {
        xch::tick(Duration::from_secs(poll_every))
    } else {
        tracing::warn!("feedback.cid / feedback.entity_id not configured; polling disabled");
        xch::never()
    };
    let dispatch_tick = xch::tick(Duration::from_secs(dispatch_every));

    let (stop_tx, stop_rx) = xch::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .wrap_err("install Ctrl-C handler")?;

    tracing::info!(dispatch_every, poll_every, "watch started");
    let mut run_dispatch = || match dispatcher.run_cycle() {
        Ok(out) => print_outcome("dispatch", &out),
        Err(e) => {
            let error = format!("{e:#}");
            tracing::error!(%error, "dispatch cycle failed");
        }
    };
    run_dispatch();
    drive(&dispatch_tick, &poll_tick, &stop_rx, run_dispatch, || {
        if let Err(e) = poller.poll(cid, entity_id) {
            let error = format!("{e:#}");
            tracing::error!(%error, "poll failed");
        }
    });
    tracing::info!("watch stopped");
    Ok(())
}
