//! Runtime permission requests for bridge plugins.
//!
//! The platform shows the prompt; the answer arrives later on the host page's
//! `onRequestPermissionsResult`. [`PermissionBroker`] ties the two together
//! through the shared callback registry, so a plugin can simply `await` the
//! outcome of a prompt.

#![warn(missing_docs)]

mod broker;

pub use broker::{PermissionBroker, PermissionResult, result_id};

use async_trait::async_trait;
use bridgekit_bridge::BridgeError;
use thiserror::Error;

/// Android `PERMISSION_GRANTED`.
pub const GRANTED: i32 = 0;
/// Android `PERMISSION_DENIED`.
pub const DENIED: i32 = -1;

/// Types of permissions plugins request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Permission {
    /// Fine or coarse device location.
    Location,
    /// Camera, for QR scanning.
    Camera,
    /// Bluetooth scan and connect.
    Bluetooth,
}

impl Permission {
    /// Platform permission names making up this permission.
    #[must_use]
    pub const fn platform_names(self) -> &'static [&'static str] {
        match self {
            Self::Location => &[
                "android.permission.ACCESS_FINE_LOCATION",
                "android.permission.ACCESS_COARSE_LOCATION",
            ],
            Self::Camera => &["android.permission.CAMERA"],
            Self::Bluetooth => &[
                "android.permission.BLUETOOTH_SCAN",
                "android.permission.BLUETOOTH_CONNECT",
            ],
        }
    }

    /// Request code used when prompting for this permission alone.
    #[must_use]
    pub const fn request_code(self) -> i32 {
        match self {
            Self::Location => 1001,
            Self::Camera => 1002,
            Self::Bluetooth => 1003,
        }
    }
}

/// The current status of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionStatus {
    /// Permission has been granted by the user.
    Granted,
    /// Permission has been denied by the user.
    Denied,
    /// Permission is restricted by policy.
    Restricted,
    /// Permission has not been requested yet.
    NotDetermined,
}

/// Errors that can occur when requesting permissions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// The platform could not show the prompt.
    #[error("permission prompt failed: {0}")]
    Prompt(String),
    /// The pending request was dropped before an answer arrived.
    #[error("permission request {0} was abandoned")]
    Abandoned(i32),
    /// The answer could not be read.
    #[error("malformed permission result: {0}")]
    Malformed(String),
    /// The user refused.
    #[error("permission denied")]
    Denied,
}

impl From<PermissionError> for BridgeError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::Denied => Self::PermissionDenied(err.to_string()),
            other => Self::System(other.to_string()),
        }
    }
}

/// The platform side of permissions.
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    /// Current status without prompting.
    async fn check(&self, permission: Permission) -> PermissionStatus;

    /// Shows the system prompt for `permissions`. The answer comes back
    /// through [`PermissionBroker::deliver_result`] with `request_code`.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::Prompt`] if the prompt cannot be shown.
    fn prompt(&self, permissions: &[Permission], request_code: i32) -> Result<(), PermissionError>;
}
