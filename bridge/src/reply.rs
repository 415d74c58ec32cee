use std::fmt;
use std::sync::Arc;

use log::warn;
use serde_json::Value;

use crate::callback::{BridgeCallback, SharedCallback};
use crate::envelope::Envelope;
use crate::error::BridgeError;
use crate::main_thread::MainThread;
use crate::registry::CallbackRegistry;

/// Error delivered when a reply is dropped before any terminal method ran.
pub const DROPPED_REPLY: &str = "request dropped without an answer";

/// One-shot answer to a bridge request.
///
/// Every terminal method consumes the reply, so a request cannot be answered
/// twice through the same `Reply`. Delivery happens on the main thread.
///
/// A reply dropped unanswered, for example by a background task that panicked
/// or returned early, rejects the request with [`DROPPED_REPLY`] so the page
/// never waits forever.
pub struct Reply {
    callback: SharedCallback,
    main: MainThread,
    answered: bool,
}

impl Reply {
    /// Creates a reply delivering to `callback` through `main`.
    #[must_use]
    pub const fn new(callback: SharedCallback, main: MainThread) -> Self {
        Self {
            callback,
            main,
            answered: false,
        }
    }

    /// Resolves with `result`.
    pub fn success(mut self, result: Value) {
        self.answered = true;
        let callback = self.callback.clone();
        self.main.post(move || callback.on_success(result));
    }

    /// Rejects with `message`.
    pub fn error(mut self, message: impl Into<String>) {
        self.answered = true;
        self.reject(message.into());
    }

    /// Resolves with a success envelope around `data`.
    pub fn envelope_success(self, data: Option<Value>, message: impl Into<String>) {
        self.success(Envelope::success(data, message).to_value());
    }

    /// Rejects with `err` serialised as a failure envelope.
    pub fn fail(self, err: &BridgeError) {
        self.error(err.to_envelope().to_json_string());
    }

    /// Resolves or rejects from `result`; errors carry their display text.
    pub fn resolve(self, result: Result<Value, BridgeError>) {
        match result {
            Ok(value) => self.success(value),
            Err(err) => self.error(err.to_string()),
        }
    }

    /// Parks the reply in `registry` under `id` so another component can
    /// resolve it later. Returns the id actually used.
    pub fn park(self, registry: &CallbackRegistry, id: &str) -> String {
        registry.register(id, Some(self.into_callback()))
    }

    /// Turns the reply into a callback that still marshals to the main thread.
    ///
    /// Whoever holds the callback owns the answer from here on.
    #[must_use]
    pub fn into_callback(mut self) -> SharedCallback {
        self.answered = true;
        Arc::new(MainThreadCallback {
            inner: self.callback.clone(),
            main: self.main.clone(),
        })
    }

    fn reject(&self, message: String) {
        let callback = self.callback.clone();
        self.main.post(move || callback.on_error(message));
    }
}

impl Drop for Reply {
    fn drop(&mut self) {
        if !self.answered {
            warn!("bridge reply dropped unanswered");
            self.reject(DROPPED_REPLY.to_owned());
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply").finish_non_exhaustive()
    }
}

struct MainThreadCallback {
    inner: SharedCallback,
    main: MainThread,
}

impl BridgeCallback for MainThreadCallback {
    fn on_success(&self, result: Value) {
        let inner = self.inner.clone();
        self.main.post(move || inner.on_success(result));
    }

    fn on_error(&self, message: String) {
        let inner = self.inner.clone();
        self.main.post(move || inner.on_error(message));
    }
}
