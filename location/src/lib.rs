//! One-shot device location for bridge plugins.
//!
//! [`LocationManager::locate`] asks for permission, listens to the GPS and
//! network providers in parallel and answers with the first fix that is
//! precise enough. When the deadline passes it falls back to the best fix
//! seen, then to the last delivered report. Positions are reported in GCJ-02.

#![warn(missing_docs)]

mod cache;
mod fix;
pub mod gcj02;
mod manager;

pub use bridgekit_permission::{Permission, PermissionStatus};
pub use cache::{CACHE_KEY, LocationReport, MemoryStore, ReportStore, load_report, save_report};
pub use fix::{Fix, Provider, now_millis, pick_seed};
pub use manager::LocationManager;

use async_channel::Sender;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Default target accuracy in meters.
pub const DEFAULT_ACCURACY: f64 = 50.0;
/// Default deadline in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 8000;

/// Parameters of one location request.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocationRequest {
    /// A fix at least this precise (meters) ends the search early.
    pub accuracy: f64,
    /// Deadline in milliseconds.
    #[serde(rename = "timeout")]
    pub timeout_ms: u64,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            accuracy: DEFAULT_ACCURACY,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Errors that can occur when locating the device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// Location permission was not granted.
    #[error("location permission denied, enable it in system settings")]
    PermissionDenied,
    /// The permission prompt could not be shown or never came back.
    #[error("location permission request failed: {0}")]
    PermissionUnavailable(String),
    /// Both GPS and network providers are off.
    #[error("location services are off, turn on GPS or network location")]
    ServiceDisabled,
    /// No usable fix or cached report before the deadline.
    #[error("location timed out with no usable position")]
    Timeout,
}

impl LocationError {
    /// Numeric code reported to web content.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::PermissionDenied => 1002,
            Self::PermissionUnavailable(_) => 1003,
            Self::ServiceDisabled => 1007,
            Self::Timeout => 1008,
        }
    }

    /// The `{code, message}` payload web content receives.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({ "code": self.code(), "message": self.to_string() })
    }
}

/// Platform location services.
pub trait LocationBackend: Send + Sync {
    /// Whether `provider` is switched on.
    fn is_provider_enabled(&self, provider: Provider) -> bool;

    /// Last fix `provider` produced, if any.
    fn last_known(&self, provider: Provider) -> Option<Fix>;

    /// Refreshes satellite assistance data before a search. Best effort.
    fn refresh_assistance(&self) {}

    /// Starts streaming fixes from `provider` into `sink` until
    /// [`LocationBackend::stop_updates`].
    fn start_updates(&self, provider: Provider, sink: Sender<Fix>);

    /// Stops every update stream started for the current search.
    fn stop_updates(&self);
}
