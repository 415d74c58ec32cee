use std::fmt;

use dashmap::DashMap;
use log::debug;
use serde_json::Value;
use uuid::Uuid;

use crate::callback::SharedCallback;

/// Pending callbacks keyed by correlation id.
///
/// Every removal is an atomic remove-and-fetch, and the handler is called only
/// after its entry is gone. Two racing `invoke`s on the same id therefore fire
/// the handler at most once.
///
/// An entry may hold `None`, a tombstone that reserves an id without a handler.
/// Invoking a tombstone just removes it.
#[derive(Default)]
pub struct CallbackRegistry {
    pending: DashMap<String, Option<SharedCallback>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `callback` under `id` and returns the id actually used.
    ///
    /// A blank `id` is replaced with a fresh UUID v4. An existing entry under
    /// the same id is overwritten.
    pub fn register(&self, id: &str, callback: Option<SharedCallback>) -> String {
        let id = if id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            id.to_owned()
        };
        if self.pending.insert(id.clone(), callback).is_some() {
            debug!("callback {id} replaced an earlier registration");
        }
        id
    }

    /// Removes `id` and calls its handler's `on_success` with `result`.
    ///
    /// Unknown ids are ignored; late or duplicate results are harmless.
    pub fn invoke(&self, id: &str, result: Value) {
        match self.pending.remove(id) {
            Some((_, Some(callback))) => callback.on_success(result),
            Some((_, None)) => debug!("callback {id} was a tombstone"),
            None => debug!("no pending callback for {id}"),
        }
    }

    /// Removes `id` and calls its handler's `on_error` with `message`.
    pub fn invoke_error(&self, id: &str, message: impl Into<String>) {
        match self.pending.remove(id) {
            Some((_, Some(callback))) => callback.on_error(message.into()),
            Some((_, None)) => debug!("callback {id} was a tombstone"),
            None => debug!("no pending callback for {id}"),
        }
    }

    /// Removes `id` and hands its handler back without calling it.
    pub fn take(&self, id: &str) -> Option<SharedCallback> {
        self.pending.remove(id).and_then(|(_, callback)| callback)
    }

    /// Removes `id` without calling its handler.
    pub fn remove(&self, id: &str) {
        self.pending.remove(id);
    }

    /// Looks up the handler under `id` without removing it.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<SharedCallback> {
        self.pending.get(id).and_then(|entry| entry.value().clone())
    }

    /// Whether `id` has an entry, tombstones included.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops every pending handler without calling it.
    pub fn clear_all(&self) {
        let dropped = self.pending.len();
        self.pending.clear();
        if dropped > 0 {
            debug!("cleared {dropped} pending callbacks");
        }
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::callback::{ChannelCallback, Outcome};

    #[test]
    fn tombstone_reserves_id_without_handler() {
        let registry = CallbackRegistry::new();
        let id = registry.register("reserved", None);

        assert!(registry.contains(&id));
        assert!(registry.get(&id).is_none());

        registry.invoke(&id, json!(1));
        assert!(!registry.contains(&id));
    }

    #[test]
    fn blank_ids_are_generated() {
        let registry = CallbackRegistry::new();
        let a = registry.register("   ", None);
        let b = registry.register("", None);

        assert!(!a.trim().is_empty());
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn invoke_error_removes_and_reports() {
        let registry = CallbackRegistry::new();
        let (callback, results) = ChannelCallback::pair();
        registry.register("scan", Some(callback));

        registry.invoke_error("scan", "empty result");
        registry.invoke("scan", json!("late"));

        assert_eq!(results.try_recv().ok(), Some(Outcome::Error("empty result".into())));
        assert!(results.try_recv().is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_registration_overwrites() {
        let registry = CallbackRegistry::new();
        let (first, first_rx) = ChannelCallback::pair();
        let (second, second_rx) = ChannelCallback::pair();
        registry.register("dup", Some(first));
        registry.register("dup", Some(second.clone()));

        assert_eq!(registry.len(), 1);
        let current = registry.get("dup").unwrap();
        assert!(Arc::ptr_eq(&current, &second));

        registry.invoke("dup", json!("x"));
        assert!(first_rx.try_recv().is_err());
        assert_eq!(second_rx.try_recv().ok(), Some(Outcome::Success(json!("x"))));
    }
}
