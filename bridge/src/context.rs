use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use log::{debug, error};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::callback::SharedCallback;
use crate::main_thread::MainThread;
use crate::plugin::panic_message;
use crate::registry::CallbackRegistry;
use crate::reply::Reply;

/// Pushes events into web content, the way `webView.callJS` would.
///
/// Always called on the main thread.
pub trait EventEmitter: Send + Sync {
    /// Delivers `payload` under the event name `event`.
    fn emit(&self, event: &str, payload: Value);
}

/// Everything a plugin needs from its host: the shared registry, the UI
/// thread queue, a runtime for background work and the event sink.
#[derive(Clone)]
pub struct BridgeContext {
    registry: Arc<CallbackRegistry>,
    main: MainThread,
    runtime: Handle,
    emitter: Option<Arc<dyn EventEmitter>>,
}

impl BridgeContext {
    /// Creates a context without an event sink.
    #[must_use]
    pub const fn new(registry: Arc<CallbackRegistry>, main: MainThread, runtime: Handle) -> Self {
        Self {
            registry,
            main,
            runtime,
            emitter: None,
        }
    }

    /// Attaches the sink used by [`BridgeContext::emit`].
    #[must_use]
    pub fn with_emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// The shared callback registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    /// Handle for posting to the UI thread.
    #[must_use]
    pub const fn main(&self) -> &MainThread {
        &self.main
    }

    /// Runtime background work is spawned on.
    #[must_use]
    pub const fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Spawns `task` on the background runtime.
    ///
    /// A panic inside `task` is logged and swallowed. Any [`Reply`] the task
    /// owned is dropped during unwinding and rejects its request.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(async move {
            if let Err(payload) = AssertUnwindSafe(task).catch_unwind().await {
                error!("background task panicked: {}", panic_message(payload.as_ref()));
            }
        })
    }

    /// Sends an event to web content from the main thread.
    pub fn emit(&self, event: &str, payload: Value) {
        let Some(emitter) = self.emitter.clone() else {
            debug!("no event emitter attached, dropping {event}");
            return;
        };
        let event = event.to_owned();
        self.main.post(move || emitter.emit(&event, payload));
    }

    /// One-shot reply for `callback`, delivered on the main thread.
    #[must_use]
    pub fn reply(&self, callback: &SharedCallback) -> Reply {
        Reply::new(callback.clone(), self.main.clone())
    }
}

impl fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeContext")
            .field("registry", &self.registry)
            .field("main", &self.main)
            .field("emitter", &self.emitter.is_some())
            .finish_non_exhaustive()
    }
}
