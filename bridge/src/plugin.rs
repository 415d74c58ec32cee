use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::callback::{BridgeCallback, OnceCallback, SharedCallback};
use crate::context::BridgeContext;
use crate::error::BridgeError;

/// A named group of bridge methods.
pub trait Plugin: Send + Sync {
    /// Name web content addresses the plugin by.
    fn name(&self) -> &str;

    /// Handles `method` if the plugin knows it.
    ///
    /// Returns `false` for unknown methods without touching `callback`.
    /// Returns `true` otherwise, after which exactly one terminal call reaches
    /// `callback`, possibly later and from the main thread.
    fn execute(
        &self,
        ctx: &BridgeContext,
        method: &str,
        params: &str,
        callback: &SharedCallback,
    ) -> bool;

    /// Releases plugin resources when the host page goes away.
    fn destroy(&self, _ctx: &BridgeContext) {}
}

/// Routes bridge calls to registered plugins.
pub struct Bridge {
    ctx: BridgeContext,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl Bridge {
    /// Creates a bridge with no plugins.
    #[must_use]
    pub const fn new(ctx: BridgeContext) -> Self {
        Self {
            ctx,
            plugins: Vec::new(),
        }
    }

    /// The context handed to every plugin.
    #[must_use]
    pub const fn context(&self) -> &BridgeContext {
        &self.ctx
    }

    /// Adds `plugin`; a plugin with the same name replaces the earlier one.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        if let Some(slot) = self.plugins.iter_mut().find(|p| p.name() == plugin.name()) {
            debug!("replacing plugin {}", plugin.name());
            *slot = plugin;
        } else {
            self.plugins.push(plugin);
        }
    }

    /// Names of the registered plugins in registration order.
    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| p.name())
    }

    /// Sends `method` to the plugin called `plugin`.
    pub fn dispatch(
        &self,
        plugin: &str,
        method: &str,
        params: &str,
        callback: SharedCallback,
    ) -> bool {
        let Some(target) = self.plugins.iter().find(|p| p.name() == plugin) else {
            warn!("no plugin named {plugin}");
            return false;
        };
        self.run(target.as_ref(), method, params, callback)
    }

    /// Offers `method` to each plugin in turn until one handles it.
    pub fn dispatch_any(&self, method: &str, params: &str, callback: SharedCallback) -> bool {
        let handled = self
            .plugins
            .iter()
            .any(|plugin| self.run(plugin.as_ref(), method, params, callback.clone()));
        if !handled {
            warn!("no plugin handles {method}");
        }
        handled
    }

    /// Destroys every plugin and drops all pending callbacks.
    pub fn shutdown(&self) {
        for plugin in &self.plugins {
            plugin.destroy(&self.ctx);
        }
        self.ctx.registry().clear_all();
    }

    fn run(&self, plugin: &dyn Plugin, method: &str, params: &str, callback: SharedCallback) -> bool {
        let once = Arc::new(OnceCallback::new(callback));
        let shared: SharedCallback = once.clone();

        match catch_unwind(AssertUnwindSafe(|| {
            plugin.execute(&self.ctx, method, params, &shared)
        })) {
            Ok(handled) => handled,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!("plugin {} panicked in {method}: {reason}", plugin.name());
                if !once.fired() {
                    once.on_error(format!("{}.{method} failed: {reason}", plugin.name()));
                }
                true
            }
        }
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("ctx", &self.ctx)
            .field("plugins", &self.plugin_names().collect::<Vec<_>>())
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

/// Parses `params` into `T`. Blank params parse as `{}`.
///
/// # Errors
///
/// Returns [`BridgeError::ParamParse`] when `params` is not valid JSON for `T`.
pub fn parse_params<T: DeserializeOwned>(params: &str) -> Result<T, BridgeError> {
    let params = if params.trim().is_empty() { "{}" } else { params };
    serde_json::from_str(params).map_err(|err| BridgeError::ParamParse(err.to_string()))
}

/// Parses `params` as a JSON object. Blank params and `null` give an empty map.
///
/// # Errors
///
/// Returns [`BridgeError::ParamParse`] for invalid JSON or a non-object value.
pub fn params_object(params: &str) -> Result<Map<String, Value>, BridgeError> {
    match parse_params::<Value>(params)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(BridgeError::ParamParse(format!(
            "params must be a JSON object, got {other}"
        ))),
    }
}
