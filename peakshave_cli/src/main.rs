#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod error_fmt;
mod run;

use std::path::Path;

use clap::Parser;
use eyre::Result;
use peakshave_config::Logging;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, JSON_MODE};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let code = match real_main(cli) {
        Ok(()) => 0,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            if cli::json_mode() {
                println!("{}", error_fmt::format_error_json(&e));
            } else {
                eprintln!("{}", error_fmt::humanize(&e));
            }
            error_fmt::exit_code_for_error(&e)
        }
    };
    std::process::exit(code);
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = run::load_config(&cli.config)?;
    // Held until the command returns so the file writer flushes before exit.
    let _file_guard = init_tracing(cli.json, &cli.log_level, &cfg.logging);
    tracing::debug!(config = %cli.config.display(), backend = ?cfg.backend.mode, "config loaded");

    match cli.cmd {
        Commands::Dispatch => run::dispatch(&cfg),
        Commands::Poll { cid, entity_id } => run::poll(&cfg, cid.as_deref(), entity_id.as_deref()),
        Commands::Status => run::status(&cfg),
        Commands::Watch {
            poll_every,
            dispatch_every,
        } => run::watch(&cfg, poll_every, dispatch_every),
        Commands::SelfCheck => run::self_check(&cfg),
    }
}

/// Console logs go to stderr (pretty or JSON), filtered by `RUST_LOG` or
/// `--log-level`. With `[logging].file` set, JSON lines are also written to a
/// rolling file at `[logging].level`.
fn init_tracing(json: bool, console_level: &str, logging: &Logging) -> Option<WorkerGuard> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(console_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };

    let mut guard = None;
    let file = logging.file.as_deref().map(|path| {
        let path = Path::new(path);
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "peakshave.log".into(), std::ffi::OsStr::to_os_string);
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, g) = tracing_appender::non_blocking(appender);
        guard = Some(g);
        let level = logging.level.as_deref().unwrap_or("info");
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")))
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init();
    guard
}
