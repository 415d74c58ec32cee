use std::sync::Arc;

use bridgekit_bridge::CallbackRegistry;
use log::{debug, warn};
use serde_json::json;

/// Registry id the pending `scanQRCode` reply is parked under.
pub const SCAN_CALLBACK_ID: &str = "scanQRCode";

/// Scanner-side handle that resolves the pending `scanQRCode` call.
#[derive(Debug, Clone)]
pub struct ScanResults {
    registry: Arc<CallbackRegistry>,
    callback_id: String,
}

impl ScanResults {
    /// Resolves the call parked under [`SCAN_CALLBACK_ID`].
    #[must_use]
    pub fn new(registry: Arc<CallbackRegistry>) -> Self {
        Self::with_callback_id(registry, SCAN_CALLBACK_ID)
    }

    /// Resolves the call parked under `callback_id`.
    #[must_use]
    pub fn with_callback_id(registry: Arc<CallbackRegistry>, callback_id: &str) -> Self {
        Self {
            registry,
            callback_id: callback_id.to_owned(),
        }
    }

    /// Hands a decoded code back to the page. Blank text is reported as an
    /// error. Returns `false` if no scan was pending.
    pub fn deliver(&self, text: &str) -> bool {
        if !self.pending() {
            return false;
        }
        if text.trim().is_empty() {
            self.registry
                .invoke_error(&self.callback_id, "scan result is empty");
        } else {
            debug!("scan finished with {} characters", text.len());
            self.registry.invoke(
                &self.callback_id,
                json!({ "data": text, "success": true }),
            );
        }
        true
    }

    /// Fails the pending scan with `message`.
    pub fn fail(&self, message: &str) -> bool {
        if !self.pending() {
            return false;
        }
        self.registry.invoke_error(&self.callback_id, message);
        true
    }

    /// The user backed out of the scanner; the page gets no answer.
    pub fn cancel(&self) {
        debug!("scan cancelled");
        self.registry.remove(&self.callback_id);
    }

    fn pending(&self) -> bool {
        let pending = self.registry.contains(&self.callback_id);
        if !pending {
            warn!("no pending scan under {}", self.callback_id);
        }
        pending
    }
}
