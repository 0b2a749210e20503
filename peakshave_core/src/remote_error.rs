//! Maps `Box<dyn Error>` from capability boundaries to typed `ControlError`.
//!
//! `peakshave_traits` uses `Box<dyn Error + Send + Sync>` so backends stay free
//! to report whatever they like; the core only needs a transport failure with
//! the full cause chain preserved as text.

use crate::error::ControlError;

/// Map a trait-boundary error to `ControlError::Transport`, flattening the
/// source chain into one line ("outer: inner: root").
pub fn map_remote_error(e: &(dyn std::error::Error + 'static)) -> ControlError {
    let mut msg = e.to_string();
    let mut src = e.source();
    while let Some(s) = src {
        let next = s.to_string();
        if !msg.ends_with(&next) {
            msg.push_str(": ");
            msg.push_str(&next);
        }
        src = s.source();
    }
    ControlError::Transport(msg)
}
