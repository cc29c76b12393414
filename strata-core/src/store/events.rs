/*
    events.rs - Subscription lists and change notifications

    Each adapter owns an explicit list of subscribers. Emission walks a
    snapshot of the list in subscription order; a subscriber added while an
    emit is in flight is not notified for that emit.
*/

use crate::store::node::Node;
use std::sync::{Arc, Mutex};

/// Which actor caused a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A write issued through the adapter's own public surface.
    Local,
    /// A write applied on behalf of a remote source, e.g. by a reconciler.
    Remote,
}

/// Payload of a `change` notification.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: String,
    /// The node stored at `path` before the mutation, if any.
    pub old_value: Option<Node>,
    /// The node stored at `path` after the mutation; `None` for a removal.
    pub new_value: Option<Node>,
    pub origin: ChangeOrigin,
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// An ordered subscriber list.
pub struct Listeners<T> {
    subscribers: Mutex<Vec<Callback<T>>>,
}

impl<T> Listeners<T> {
    pub fn new() -> Self {
        Listeners {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.lock().push(Arc::new(callback));
    }

    /// Notify every subscriber registered before this call, in subscription
    /// order.
    pub fn emit(&self, event: &T) {
        let snapshot: Vec<Callback<T>> = self.lock().clone();
        for callback in snapshot {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Callback<T>>> {
        // A poisoned subscriber list is still a valid list.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribers_notified_in_subscription_order() {
        let listeners = Listeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            listeners.subscribe(move |_: &u32| seen.lock().unwrap().push(tag));
        }

        listeners.emit(&1);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_subscriber_added_during_emit_not_notified() {
        let listeners = Arc::new(Listeners::new());
        let calls = Arc::new(Mutex::new(0u32));

        let inner_listeners = listeners.clone();
        let inner_calls = calls.clone();
        listeners.subscribe(move |_: &u32| {
            let calls = inner_calls.clone();
            inner_listeners.subscribe(move |_: &u32| {
                *calls.lock().unwrap() += 1;
            });
        });

        listeners.emit(&1);
        assert_eq!(*calls.lock().unwrap(), 0);

        // The late subscriber is live for the next emit.
        listeners.emit(&2);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_len_tracks_subscriptions() {
        let listeners: Listeners<u32> = Listeners::new();
        assert!(listeners.is_empty());
        listeners.subscribe(|_| {});
        assert_eq!(listeners.len(), 1);
    }
}
