//! Content lifecycle events.
//!
//! An explicit observer registry replaces global multicast: subscribers are
//! registered on the [`EventBus`] owned by the scope provider, and services
//! dispatch through the scope. Cancelable events run before the mutation and
//! may abort it; their past-tense counterparts fire after persistence. The
//! services never depend on whether anything is subscribed.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

/// Scope of a tree-cache invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TreeChangeKind {
    RefreshNode,
    RefreshBranch,
    RefreshAll,
    Remove,
}

/// Payload describing one node touched by a move.
#[derive(Debug, Clone, Serialize)]
pub struct MoveInfo {
    pub id: i32,
    pub original_path: String,
    pub new_parent_id: i32,
}

/// A content lifecycle event. Payloads carry ids and paths, not live
/// entities, so handlers cannot observe half-mutated state.
#[derive(Debug, Clone, Serialize)]
pub enum ContentEvent {
    Saving { id: i32, name: String },
    Saved { id: i32, name: String },
    Publishing { id: i32 },
    Published { ids: Vec<i32> },
    Unpublishing { id: i32 },
    Unpublished { id: i32 },
    Trashing { id: i32, original_path: String },
    Trashed { moves: Vec<MoveInfo> },
    Moving { id: i32, original_path: String, new_parent_id: i32 },
    Moved { moves: Vec<MoveInfo> },
    Copying { id: i32, new_parent_id: i32 },
    Copied { id: i32, copy_id: i32 },
    Deleting { id: i32 },
    Deleted { id: i32 },
    Sorting { ids: Vec<i32> },
    Sorted { ids: Vec<i32> },
    TreeChanged { id: i32, kind: TreeChangeKind },
    TypeSaving { alias: String },
    TypeSaved { alias: String },
    TypeDeleting { id: i32 },
    TypeDeleted { ids: Vec<i32> },
}

/// Handler verdict for cancelable dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResponse {
    Continue,
    Cancel,
}

type Handler = dyn Fn(&ContentEvent) -> EventResponse + Send + Sync;

/// Registry of event subscribers.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<Handler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Handlers run in subscription order.
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&ContentEvent) -> EventResponse + Send + Sync + 'static,
    {
        self.handlers.write().push(Arc::new(handler));
    }

    /// Register a handler that only observes and never cancels.
    pub fn observe<F>(&self, handler: F)
    where
        F: Fn(&ContentEvent) + Send + Sync + 'static,
    {
        self.subscribe(move |event| {
            handler(event);
            EventResponse::Continue
        });
    }

    /// Dispatch a cancelable event. Returns true when any handler cancels;
    /// remaining handlers still run, matching multicast semantics.
    pub fn dispatch_cancelable(&self, event: &ContentEvent) -> bool {
        let handlers = self.handlers.read().clone();
        let mut cancelled = false;
        for handler in handlers {
            if handler(event) == EventResponse::Cancel {
                cancelled = true;
            }
        }
        cancelled
    }

    /// Dispatch a fire-and-forget event.
    pub fn dispatch(&self, event: &ContentEvent) {
        let handlers = self.handlers.read().clone();
        for handler in handlers {
            let _ = handler(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn cancel_verdict_wins_but_all_handlers_run() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        bus.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            EventResponse::Cancel
        });
        let c = calls.clone();
        bus.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            EventResponse::Continue
        });

        let cancelled = bus.dispatch_cancelable(&ContentEvent::Saving {
            id: 1,
            name: "Home".to_string(),
        });
        assert!(cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dispatch_without_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        assert!(!bus.dispatch_cancelable(&ContentEvent::Deleting { id: 1 }));
        bus.dispatch(&ContentEvent::Deleted { id: 1 });
    }

    #[test]
    fn events_serialize_for_external_consumers() {
        let event = ContentEvent::Moved {
            moves: vec![MoveInfo {
                id: 7,
                original_path: "-1,7".to_string(),
                new_parent_id: 3,
            }],
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"Moved\""));
        assert!(json.contains("\"original_path\":\"-1,7\""));
    }
}
