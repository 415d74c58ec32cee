//! Page-level plugins for hybrid WebView apps.
//!
//! [`BasePlugin`] (`QXBasePlugin`) bundles what most pages need: QR scanning,
//! back navigation, device and safe-area info, location, downloads and map
//! hand-off. [`HostBridgePlugin`] (`QXHostBridgePlugin`) forwards everything
//! else to the embedding app through a [`HostDelegate`].

#![warn(missing_docs)]

mod base;
mod host;
mod scan;

pub use base::{BASE_PLUGIN_NAME, BasePlugin, BaseServices};
pub use host::{HOST_PLUGIN_NAME, HostBridgePlugin, HostDelegate};
pub use scan::{SCAN_CALLBACK_ID, ScanResults};

use async_trait::async_trait;
use bridgekit_bridge::BridgeError;

/// The page hosting the WebView.
#[async_trait]
pub trait WebViewHost: Send + Sync {
    /// Whether the WebView has history to go back to.
    fn can_go_back(&self) -> bool;

    /// Goes back one history entry.
    fn go_back(&self);

    /// Asks the user whether to leave the page.
    async fn confirm_exit(&self) -> bool;

    /// Closes the page.
    fn finish(&self);
}

/// Starts the QR scanner screen.
pub trait ScannerLauncher: Send + Sync {
    /// Opens the scanner. Its result comes back through [`ScanResults`]
    /// under `callback_id`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::System`] if the screen cannot be shown.
    fn launch(&self, callback_id: &str) -> Result<(), BridgeError>;
}
