//! JS bridge core for hybrid WebView apps.
//!
//! Web content calls native code through named plugins: a call is a
//! `(plugin, method, params)` triple where `params` is a JSON object string.
//! The [`Bridge`] routes the call to a [`Plugin`], which answers synchronously
//! whether it handled the method and later resolves the caller's callback
//! exactly once.
//!
//! Operations that finish inside another component (a scanner screen, a
//! permission prompt) park their callback in the [`CallbackRegistry`] under a
//! correlation id. Whoever holds the result resolves it through the same id.
//!
//! ```rust
//! use bridgekit_bridge::{CallbackRegistry, ChannelCallback, Outcome};
//!
//! let registry = CallbackRegistry::new();
//! let (callback, results) = ChannelCallback::pair();
//! let id = registry.register("", Some(callback));
//!
//! registry.invoke(&id, serde_json::json!("done"));
//! registry.invoke(&id, serde_json::json!("ignored"));
//!
//! assert_eq!(results.try_recv().ok(), Some(Outcome::Success(serde_json::json!("done"))));
//! assert!(results.try_recv().is_err());
//! ```

#![warn(missing_docs)]

mod callback;
mod code;
mod context;
mod envelope;
mod error;
mod main_thread;
mod plugin;
mod registry;
mod reply;

pub use callback::{BridgeCallback, ChannelCallback, FnCallback, OnceCallback, Outcome, SharedCallback};
pub use code::ErrorCode;
pub use context::{BridgeContext, EventEmitter};
pub use envelope::Envelope;
pub use error::BridgeError;
pub use main_thread::{MainLoop, MainThread, main_thread};
pub use plugin::{Bridge, Plugin, parse_params, params_object};
pub use registry::CallbackRegistry;
pub use reply::{DROPPED_REPLY, Reply};

/// Convenience alias for a result with [`BridgeError`].
pub type Result<T, E = BridgeError> = core::result::Result<T, E>;
