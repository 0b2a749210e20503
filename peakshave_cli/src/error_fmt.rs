//! Human-readable error descriptions, stable exit codes and structured JSON
//! error formatting.

use peakshave_core::error::{BuildError, ControlError, ScheduleError};
use peakshave_remote::RemoteError;

pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_TRANSPORT: i32 = 3;
pub const EXIT_MISSING_PARAMETER: i32 = 4;
pub const EXIT_CONFIG: i32 = 5;

/// First error of type `T` anywhere in the report's chain.
fn find<'a, T: std::error::Error + 'static>(err: &'a eyre::Report) -> Option<&'a T> {
    err.chain().find_map(|e| e.downcast_ref::<T>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = find::<BuildError>(err) {
        return match be {
            BuildError::MissingSchedule | BuildError::MissingStateStore | BuildError::MissingSigner => format!(
                "What happened: The dispatcher could not be assembled ({be}).\nLikely causes: A backend failed to initialize.\nHow to fix: Run `peakshave self-check` and fix the first failing check."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid control configuration ({msg}).\nLikely causes: Out-of-range values in [schedule] or [control].\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ce) = find::<ControlError>(err) {
        return match ce {
            ControlError::Transport(msg) => format!(
                "What happened: The remote call failed ({msg}).\nLikely causes: Home Assistant or the signer integration is unreachable, the token was rejected, or the signer cloud refused the request.\nHow to fix: Check [backend] base_url/token and the signer integration, then rerun. Nothing was retried."
            ),
            ControlError::MissingParameter(name) => format!(
                "What happened: Required parameter `{name}` was not provided.\nLikely causes: Neither the command line nor [feedback] in the config sets it.\nHow to fix: Pass --{} or set feedback.{name} in the config.",
                name.replace('_', "-")
            ),
            ControlError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing file, TOML syntax error, or out-of-range values.\nHow to fix: Edit the config file, then rerun `peakshave self-check`."
            ),
            ControlError::Schedule(ScheduleError::NotFound { day, path }) => format!(
                "What happened: No schedule for {day} at {path}.\nLikely causes: The expansion step has not run yet today, or schedule.path points elsewhere.\nHow to fix: Regenerate the day's schedule or fix schedule.path."
            ),
            ControlError::Schedule(ScheduleError::Malformed { path, reason }) => format!(
                "What happened: The schedule at {path} could not be parsed ({reason}).\nLikely causes: A partially written or hand-edited file.\nHow to fix: Regenerate the day's schedule."
            ),
            ControlError::Slot(e) => format!(
                "What happened: {e}.\nLikely causes: The schedule was generated for a different slot width.\nHow to fix: Match schedule.granularity_minutes to the expansion step."
            ),
        };
    }

    if let Some(RemoteError::Auth) = find::<RemoteError>(err) {
        return "What happened: Home Assistant rejected the access token.\nLikely causes: Expired or revoked long-lived token.\nHow to fix: Create a new token and set backend.token or HA_TOKEN.".to_string();
    }

    // Generic fallback
    let msg = format!("{err:#}");
    format!(
        "Something went wrong: {msg}\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
    )
}

/// Stable exit codes: transport 3, missing parameter 4, configuration 5,
/// anything else 1. Usage errors exit 2 from clap itself.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(BuildError::InvalidConfig(_)) = find::<BuildError>(err) {
        return EXIT_CONFIG;
    }
    match find::<ControlError>(err) {
        Some(ControlError::Transport(_)) => EXIT_TRANSPORT,
        Some(ControlError::MissingParameter(_)) => EXIT_MISSING_PARAMETER,
        Some(ControlError::Config(_)) => EXIT_CONFIG,
        _ => EXIT_GENERIC,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match find::<ControlError>(err) {
        Some(ControlError::Transport(_)) => "Transport",
        Some(ControlError::MissingParameter(_)) => "MissingParameter",
        Some(ControlError::Config(_)) => "Config",
        Some(ControlError::Schedule(_)) => "Schedule",
        Some(ControlError::Slot(_)) => "Slot",
        None if find::<BuildError>(err).is_some() => "Build",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "error": format!("{err:#}"),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    fn wrapped(e: ControlError) -> eyre::Report {
        Err::<(), _>(e).wrap_err("dispatch cycle").unwrap_err()
    }

    #[test]
    fn exit_codes_survive_context() {
        assert_eq!(
            exit_code_for_error(&wrapped(ControlError::Transport("boom".into()))),
            EXIT_TRANSPORT
        );
        assert_eq!(
            exit_code_for_error(&wrapped(ControlError::MissingParameter("cid"))),
            EXIT_MISSING_PARAMETER
        );
        assert_eq!(
            exit_code_for_error(&wrapped(ControlError::Config("x".into()))),
            EXIT_CONFIG
        );
        assert_eq!(
            exit_code_for_error(&eyre::Report::new(BuildError::InvalidConfig("threshold"))),
            EXIT_CONFIG
        );
        assert_eq!(exit_code_for_error(&eyre::eyre!("other")), EXIT_GENERIC);
    }

    #[test]
    fn humanize_names_the_missing_flag() {
        let msg = humanize(&wrapped(ControlError::MissingParameter("entity_id")));
        assert!(msg.starts_with("What happened: Required parameter `entity_id`"));
        assert!(msg.contains("--entity-id"));
    }

    #[test]
    fn json_error_is_one_line() {
        let line = format_error_json(&wrapped(ControlError::Transport("connection refused".into())));
        assert!(!line.contains('\n'));
        let v: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["reason"], "Transport");
        assert_eq!(v["exit_code"], 3);
        assert!(v["error"].as_str().unwrap().contains("connection refused"));
    }
}
