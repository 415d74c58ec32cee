//! Callback handlers that receive bridge results.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_channel::{Receiver, Sender, unbounded};
use log::warn;
use serde_json::Value;

/// Receiver of the terminal result of one bridge request.
///
/// Implementations must be cheap to call from the main thread; anything heavy
/// belongs on a background task.
pub trait BridgeCallback: Send + Sync {
    /// Called with the operation result.
    fn on_success(&self, result: Value);

    /// Called with a human-readable error message.
    fn on_error(&self, message: String);
}

/// Shared handle to a callback. Identity is preserved across clones, so
/// `Arc::ptr_eq` tells whether two handles point at the same handler.
pub type SharedCallback = Arc<dyn BridgeCallback>;

/// Terminal result delivered to a callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// `on_success` fired with this value.
    Success(Value),
    /// `on_error` fired with this message.
    Error(String),
}

impl Outcome {
    /// Returns the success value, if any.
    #[must_use]
    pub const fn success(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Error(message) => Some(message),
        }
    }
}

/// Callback backed by a closure receiving the [`Outcome`].
pub struct FnCallback<F> {
    f: F,
}

impl<F> FnCallback<F>
where
    F: Fn(Outcome) + Send + Sync + 'static,
{
    /// Wraps `f` into a shared callback.
    pub fn shared(f: F) -> SharedCallback {
        Arc::new(Self { f })
    }
}

impl<F> fmt::Debug for FnCallback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCallback").finish_non_exhaustive()
    }
}

impl<F> BridgeCallback for FnCallback<F>
where
    F: Fn(Outcome) + Send + Sync,
{
    fn on_success(&self, result: Value) {
        (self.f)(Outcome::Success(result));
    }

    fn on_error(&self, message: String) {
        (self.f)(Outcome::Error(message));
    }
}

/// Callback forwarding every outcome into a channel, so the caller can await it.
#[derive(Debug)]
pub struct ChannelCallback {
    sender: Sender<Outcome>,
}

impl ChannelCallback {
    /// Creates a callback and the receiver its outcomes arrive on.
    #[must_use]
    pub fn pair() -> (SharedCallback, Receiver<Outcome>) {
        let (sender, receiver) = unbounded();
        (Arc::new(Self { sender }), receiver)
    }

    fn send(&self, outcome: Outcome) {
        if let Err(err) = self.sender.try_send(outcome) {
            warn!("dropping bridge outcome, receiver gone: {err}");
        }
    }
}

impl BridgeCallback for ChannelCallback {
    fn on_success(&self, result: Value) {
        self.send(Outcome::Success(result));
    }

    fn on_error(&self, message: String) {
        self.send(Outcome::Error(message));
    }
}

/// Wrapper letting at most one terminal call through to the inner callback.
pub struct OnceCallback {
    inner: SharedCallback,
    fired: AtomicBool,
}

impl OnceCallback {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: SharedCallback) -> Self {
        Self {
            inner,
            fired: AtomicBool::new(false),
        }
    }

    /// Whether a terminal call already went through.
    #[must_use]
    pub fn fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    fn claim(&self) -> bool {
        !self.fired.swap(true, Ordering::AcqRel)
    }
}

impl fmt::Debug for OnceCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceCallback")
            .field("fired", &self.fired())
            .finish_non_exhaustive()
    }
}

impl BridgeCallback for OnceCallback {
    fn on_success(&self, result: Value) {
        if self.claim() {
            self.inner.on_success(result);
        } else {
            warn!("callback already resolved, dropping success: {result}");
        }
    }

    fn on_error(&self, message: String) {
        if self.claim() {
            self.inner.on_error(message);
        } else {
            warn!("callback already resolved, dropping error: {message}");
        }
    }
}
