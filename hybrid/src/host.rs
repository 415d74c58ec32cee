use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use bridgekit_bridge::{BridgeContext, Plugin, Reply, SharedCallback, params_object};
use log::{debug, warn};
use serde_json::{Map, Value, json};

/// Name web content addresses the plugin by.
pub const HOST_PLUGIN_NAME: &str = "QXHostBridgePlugin";

/// The embedding app's side of [`HostBridgePlugin`].
///
/// A `None` completion means plain success; web content then receives
/// `{"success": true}`.
#[async_trait]
pub trait HostDelegate: Send + Sync {
    /// Opens a native page at `url`.
    async fn open_page(&self, url: &str, params: Option<Map<String, Value>>) -> Option<Value>;

    /// Handles any other method.
    async fn custom_method(&self, method: &str, params: Map<String, Value>) -> Option<Value>;
}

/// Forwards every call to the app's [`HostDelegate`].
#[derive(Default)]
pub struct HostBridgePlugin {
    delegate: RwLock<Option<Arc<dyn HostDelegate>>>,
}

impl HostBridgePlugin {
    /// Creates the plugin with no delegate; calls fail until one is set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs or clears the delegate.
    pub fn set_delegate(&self, delegate: Option<Arc<dyn HostDelegate>>) {
        *self
            .delegate
            .write()
            .unwrap_or_else(PoisonError::into_inner) = delegate;
    }

    fn delegate(&self) -> Option<Arc<dyn HostDelegate>> {
        self.delegate
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Plugin for HostBridgePlugin {
    fn name(&self) -> &str {
        HOST_PLUGIN_NAME
    }

    fn execute(
        &self,
        ctx: &BridgeContext,
        method: &str,
        params: &str,
        callback: &SharedCallback,
    ) -> bool {
        debug!("{HOST_PLUGIN_NAME}.{method}");
        let reply = ctx.reply(callback);
        let mut params = match params_object(params) {
            Ok(map) => map,
            Err(err) => {
                reply.error(err.to_string());
                return true;
            }
        };
        let Some(delegate) = self.delegate() else {
            warn!("{HOST_PLUGIN_NAME}.{method} called with no delegate");
            reply.error("host delegate not set");
            return true;
        };

        if method == "openPage" {
            let url = match params.remove("url") {
                Some(Value::String(url)) if !url.trim().is_empty() => url,
                _ => {
                    reply.error("url is required");
                    return true;
                }
            };
            let page_params = match params.remove("params") {
                Some(Value::Object(map)) => Some(map),
                _ => None,
            };
            ctx.spawn(async move {
                complete(reply, delegate.open_page(&url, page_params).await);
            });
        } else {
            let method = method.to_owned();
            ctx.spawn(async move {
                complete(reply, delegate.custom_method(&method, params).await);
            });
        }
        true
    }
}

impl fmt::Debug for HostBridgePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBridgePlugin")
            .field("delegate", &self.delegate().is_some())
            .finish()
    }
}

fn complete(reply: Reply, result: Option<Value>) {
    reply.success(completion_value(result));
}

fn completion_value(result: Option<Value>) -> Value {
    match result {
        None | Some(Value::Null) => json!({ "success": true }),
        Some(value @ Value::Object(_)) => value,
        Some(other) => json!({ "data": other }),
    }
}
