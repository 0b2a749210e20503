//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "peakshave", version, about = "Peak-shaving export limit controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/peakshave.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one dispatch cycle for the current slot
    Dispatch,
    /// Read one register through the signer and publish it
    Poll {
        /// Register id (defaults to feedback.cid)
        #[arg(long, value_name = "CID")]
        cid: Option<String>,
        /// Destination entity (defaults to feedback.entity_id)
        #[arg(long = "entity-id", value_name = "ENTITY")]
        entity_id: Option<String>,
    },
    /// Show what a dispatch would do right now, without writing
    Status,
    /// Keep dispatching and polling on fixed periods until Ctrl-C
    Watch {
        /// Seconds between feedback polls
        #[arg(long, value_name = "SECS", default_value_t = 60)]
        poll_every: u64,
        /// Seconds between dispatch cycles
        #[arg(long, value_name = "SECS", default_value_t = 900)]
        dispatch_every: u64,
    },
    /// Validate config, load today's schedule and reach the backend
    SelfCheck,
}
