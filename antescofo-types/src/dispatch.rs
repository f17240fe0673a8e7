//! Subscription registry and event fan-out.
//!
//! Handlers register against one [`EventKind`] or against all kinds
//! (wildcard). `dispatch` runs every wildcard handler, then every handler
//! for the event's kind, in registration order. A panicking handler is
//! logged and skipped; it never takes down its siblings or the caller.
//!
//! The registry is shared between the caller thread (subscribe /
//! unsubscribe) and the receive thread (dispatch). `dispatch` snapshots
//! the relevant buckets under the lock and invokes handlers outside it,
//! so handlers may themselves subscribe or unsubscribe without deadlock.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error};

use crate::event::{Event, EventKind};

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Opaque token identifying one subscription. Subscribing the same
/// closure twice yields two tokens and two invocations per dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
struct Registry {
    by_kind: HashMap<EventKind, Vec<(HandlerId, Handler)>>,
    wildcard: Vec<(HandlerId, Handler)>,
}

/// Registry of event handlers plus the dispatch routine.
pub struct EventDispatcher {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a handler for `kind`, or for every kind when `None`.
    pub fn subscribe<F>(&self, kind: Option<EventKind>, handler: F) -> HandlerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handler: Handler = Arc::new(handler);
        let mut registry = self.lock();
        match kind {
            None => registry.wildcard.push((id, handler)),
            Some(kind) => registry.by_kind.entry(kind).or_default().push((id, handler)),
        }
        debug!("subscribed {:?} to {:?}", id, kind);
        id
    }

    /// Remove one subscription. Removing an id that is not present in the
    /// named bucket is a silent no-op.
    pub fn unsubscribe(&self, kind: Option<EventKind>, id: HandlerId) {
        let mut registry = self.lock();
        let bucket = match kind {
            None => Some(&mut registry.wildcard),
            Some(kind) => registry.by_kind.get_mut(&kind),
        };
        if let Some(bucket) = bucket {
            if let Some(pos) = bucket.iter().position(|(hid, _)| *hid == id) {
                bucket.remove(pos);
                debug!("unsubscribed {:?} from {:?}", id, kind);
            }
        }
    }

    /// Invoke all wildcard handlers, then all handlers for `event.kind`,
    /// each in registration order. Never fails because a handler failed.
    pub fn dispatch(&self, event: &Event) {
        let (wildcard, specific) = {
            let registry = self.lock();
            let wildcard: Vec<Handler> = registry
                .wildcard
                .iter()
                .map(|(_, h)| Arc::clone(h))
                .collect();
            let specific: Vec<Handler> = registry
                .by_kind
                .get(&event.kind)
                .map(|bucket| bucket.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default();
            (wildcard, specific)
        };

        debug!(
            "dispatching {} event to {} handlers",
            event.kind,
            wildcard.len() + specific.len()
        );
        for handler in wildcard.iter().chain(specific.iter()) {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                error!("event handler panicked while handling {} event", event.kind);
            }
        }
    }

    /// Drop every subscription. Idempotent.
    pub fn clear(&self) {
        let mut registry = self.lock();
        registry.by_kind.clear();
        registry.wildcard.clear();
        debug!("cleared all event handlers");
    }

    // The lock is never held while a handler runs, so a poisoned mutex
    // only means a panic hit between two registry operations; the data
    // itself is still consistent.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|e| e.into_inner())
    }
}
