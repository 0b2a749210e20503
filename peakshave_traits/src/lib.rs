pub mod clock;

pub use clock::{Clock, FixedClock, SystemClock};

/// Error type crossing every capability boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Named-key scalar state (sensors, helpers, toggles).
///
/// `get` returns the raw state string exactly as the store holds it; sentinel
/// handling ("unknown", "unavailable", ...) is the caller's policy.
pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<String>, BoxError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), BoxError>;
}

/// Authenticated, rate-limited channel to the cloud device API.
pub trait RemoteSigner {
    /// Push a new export limit. The signer performs its own change detection.
    fn set_grid_power_limit(&mut self, watts: i64, threshold_w: i64) -> Result<(), BoxError>;

    /// Generic signed read. `Ok(None)` means the signer answered without a body.
    fn generic_read(
        &mut self,
        path: &str,
        payload: &serde_json::Value,
    ) -> Result<Option<serde_json::Value>, BoxError>;
}

impl<T: StateStore + ?Sized> StateStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, BoxError> {
        (**self).get(key)
    }
    fn set(&mut self, key: &str, value: &str) -> Result<(), BoxError> {
        (**self).set(key, value)
    }
}

impl<T: RemoteSigner + ?Sized> RemoteSigner for Box<T> {
    fn set_grid_power_limit(&mut self, watts: i64, threshold_w: i64) -> Result<(), BoxError> {
        (**self).set_grid_power_limit(watts, threshold_w)
    }
    fn generic_read(
        &mut self,
        path: &str,
        payload: &serde_json::Value,
    ) -> Result<Option<serde_json::Value>, BoxError> {
        (**self).generic_read(path, payload)
    }
}
