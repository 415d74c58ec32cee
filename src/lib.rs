//! # Bridgekit
//!
//! Native plugins for hybrid WebView apps, reachable from web content through
//! a JS bridge.
//!
//! Web content calls `execute(plugin, method, params)`; the [`bridge`] crate
//! routes the call to a [`Plugin`](bridge::Plugin), and the plugin answers
//! later through a correlation registry on the UI thread. Platform facilities
//! (permission prompts, GATT, location providers, intents) are traits the host
//! app implements.
//!
//! ## Features
//!
//! The kit is modular. Enable only the capabilities a page needs.
//!
//! - `permission`: Runtime permission prompts bridged through the registry.
//! - `location`: One-shot positioning with GCJ-02 output and cache fallback.
//! - `system`: Device info and safe-area reports.
//! - `map`: Navigation hand-off to Amap, Baidu and Tencent maps.
//! - `fs`: File download and open.
//! - `ble`: The `QXBlePlugin` Bluetooth Low Energy plugin.
//! - `hybrid`: The `QXBasePlugin` and `QXHostBridgePlugin` page plugins.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! bridgekit = { version = "0.1", features = ["ble", "hybrid"] }
//! ```
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use bridgekit::bridge::{Bridge, BridgeContext, CallbackRegistry, FnCallback, main_thread};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (main, main_loop) = main_thread();
//! let ctx = BridgeContext::new(
//!     Arc::new(CallbackRegistry::new()),
//!     main,
//!     tokio::runtime::Handle::current(),
//! );
//! let mut bridge = Bridge::new(ctx);
//! bridgekit::register_all_plugins(&mut bridge, bridgekit::PluginSet::default());
//!
//! let handled = bridge.dispatch("QXBasePlugin", "getDeviceInfo", "{}", FnCallback::shared(|_| {}));
//! assert!(!handled);
//! main_loop.run_pending();
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

pub use bridgekit_bridge as bridge;

#[cfg(feature = "permission")]
pub use bridgekit_permission as permission;

#[cfg(feature = "location")]
pub use bridgekit_location as location;

#[cfg(feature = "system")]
pub use bridgekit_system as system;

#[cfg(feature = "map")]
pub use bridgekit_map as map;

#[cfg(feature = "fs")]
pub use bridgekit_fs as fs;

#[cfg(feature = "ble")]
pub use bridgekit_ble as ble;

#[cfg(feature = "hybrid")]
pub use bridgekit_hybrid as hybrid;

use bridge::{Bridge, Plugin};
use log::info;

/// The plugins a host page installs. Missing entries are skipped.
#[derive(Default)]
pub struct PluginSet {
    /// `QXBasePlugin`.
    #[cfg(feature = "hybrid")]
    pub base: Option<hybrid::BasePlugin>,
    /// `QXHostBridgePlugin`. Shared so the app can swap delegates later.
    #[cfg(feature = "hybrid")]
    pub host: Option<Arc<hybrid::HostBridgePlugin>>,
    /// `QXBlePlugin`.
    #[cfg(feature = "ble")]
    pub ble: Option<ble::BlePlugin>,
    /// App-specific plugins, registered last.
    pub extra: Vec<Arc<dyn Plugin>>,
}

impl fmt::Debug for PluginSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSet")
            .field("extra", &self.extra.len())
            .finish_non_exhaustive()
    }
}

/// Registers every plugin in `plugins` on `bridge`.
///
/// The host bridge plugin answers any method, so it is registered after the
/// named plugins to keep [`Bridge::dispatch_any`] reaching them first.
pub fn register_all_plugins(bridge: &mut Bridge, plugins: PluginSet) {
    #[cfg(feature = "hybrid")]
    if let Some(base) = plugins.base {
        bridge.register(Arc::new(base));
    }
    #[cfg(feature = "ble")]
    if let Some(ble) = plugins.ble {
        bridge.register(Arc::new(ble));
    }
    for plugin in plugins.extra {
        bridge.register(plugin);
    }
    #[cfg(feature = "hybrid")]
    if let Some(host) = plugins.host {
        bridge.register(host);
    }
    info!(
        "bridge plugins: {}",
        bridge.plugin_names().collect::<Vec<_>>().join(", ")
    );
}
