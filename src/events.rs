// src/events.rs
//! Registration notifications.
//!
//! Subscribers are called synchronously on the registering thread. A
//! subscriber that returns an error or panics is logged and recorded; the
//! registration that triggered it is unaffected.

use crate::stack::ResourceDescriptor;
use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::error;

/// Emitted once per descriptor newly added to a tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagRegistered {
    pub name: String,
    pub descriptor: ResourceDescriptor,
}

pub type SubscriberId = u64;

/// Subscribers may fail; the message is kept in [`EventBus::errors`].
pub type Subscriber = Arc<dyn Fn(&TagRegistered) -> Result<(), String> + Send + Sync>;

pub struct EventBus {
    subscribers: DashMap<SubscriberId, Subscriber>,
    next: AtomicU64,
    /// Recent notification failures.
    errors: Mutex<Vec<String>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus {
            subscribers: DashMap::new(),
            next: AtomicU64::new(1),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, subscriber: Subscriber) -> SubscriberId {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        self.subscribers.insert(id, subscriber);
        id
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver `event` to every subscriber. Returns how many succeeded.
    pub fn emit(&self, event: &TagRegistered) -> usize {
        // clone out so no shard lock is held while foreign code runs
        let subscribers: Vec<(SubscriberId, Subscriber)> = self
            .subscribers
            .iter()
            .map(|kv| (*kv.key(), kv.value().clone()))
            .collect();

        let mut delivered = 0;
        for (id, subscriber) in subscribers {
            let outcome = catch_unwind(AssertUnwindSafe(|| subscriber(event)));
            let failure = match outcome {
                Ok(Ok(())) => {
                    delivered += 1;
                    continue;
                }
                Ok(Err(err)) => err,
                Err(panic) => panic_message(panic.as_ref()),
            };
            error!(subscriber = id, name = %event.name, descriptor = %event.descriptor, err = %failure, "tag subscriber failed");
            self.errors
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(failure);
        }
        delivered
    }

    /// Snapshot of recorded notification failures.
    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "subscriber panicked".to_string()
    }
}
