//! Subscriber registry for normalized update events.
//!
//! Handlers are registered per [`UpdateEventKind`] via
//! [`LiveUpdatesManager::on`](crate::LiveUpdatesManager::on) and removed via
//! [`off`](crate::LiveUpdatesManager::off). Multiple handlers per kind are
//! permitted and invoked in insertion order.
//!
//! Dispatch iterates over a snapshot of the handler list, so a handler that
//! unsubscribes itself (or others) mid-dispatch cannot corrupt the
//! iteration. A panicking handler is caught and logged; the remaining
//! handlers still run and the connection is unaffected.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{UpdateEvent, UpdateEventKind};

/// Opaque token identifying one registered handler. Returned by `on`,
/// consumed by `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Arc<dyn Fn(&UpdateEvent) + Send + Sync>;

#[derive(Default)]
struct HandlerTable {
    next_id: u64,
    entries: HashMap<UpdateEventKind, Vec<(HandlerId, Handler)>>,
}

/// Shared subscriber registry.
///
/// Cloning shares the underlying table: the manager handle and the background
/// connection task both hold one.
#[derive(Clone, Default)]
pub(crate) struct Subscribers {
    table: Arc<Mutex<HandlerTable>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HandlerTable> {
        // The lock is never held across a handler call, so a poisoned lock
        // can only mean a panic between our own field updates; the table is
        // still structurally sound.
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a handler for one event kind. Insertion order is dispatch
    /// order.
    pub fn on(
        &self,
        kind: UpdateEventKind,
        handler: impl Fn(&UpdateEvent) + Send + Sync + 'static,
    ) -> HandlerId {
        let mut table = self.lock();
        let id = HandlerId(table.next_id);
        table.next_id += 1;
        table
            .entries
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a previously registered handler. Returns false if it was
    /// already gone.
    pub fn off(&self, kind: UpdateEventKind, id: HandlerId) -> bool {
        let mut table = self.lock();
        match table.entries.get_mut(&kind) {
            Some(handlers) => {
                let before = handlers.len();
                handlers.retain(|(hid, _)| *hid != id);
                handlers.len() != before
            }
            None => false,
        }
    }

    /// Drop every registration (called by `destroy()`).
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of handlers currently registered for a kind.
    #[cfg(test)]
    pub fn handler_count(&self, kind: UpdateEventKind) -> usize {
        self.lock()
            .entries
            .get(&kind)
            .map(|h| h.len())
            .unwrap_or(0)
    }

    /// Invoke every handler registered for the event's kind.
    ///
    /// [`UpdateEvent::Unknown`] has no kind and is never dispatched.
    pub fn dispatch(&self, event: &UpdateEvent) {
        let Some(kind) = event.kind() else {
            return;
        };

        // Snapshot under the lock, invoke outside it.
        let snapshot: Vec<Handler> = {
            let table = self.lock();
            match table.entries.get(&kind) {
                Some(handlers) => handlers.iter().map(|(_, h)| h.clone()).collect(),
                None => return,
            }
        };

        for handler in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                log::warn!(
                    "[arena-link] subscriber for '{}' panicked; remaining handlers still run",
                    kind
                );
            }
        }
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.lock();
        let mut counts: Vec<(UpdateEventKind, usize)> = table
            .entries
            .iter()
            .map(|(k, v)| (*k, v.len()))
            .collect();
        counts.sort_by_key(|(k, _)| k.as_tag());
        f.debug_struct("Subscribers").field("handlers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn heartbeat() -> UpdateEvent {
        UpdateEvent::Heartbeat
    }

    #[test]
    fn test_handlers_run_in_insertion_order() {
        let subs = Subscribers::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = order.clone();
            subs.on(UpdateEventKind::Heartbeat, move |_| {
                order.lock().unwrap().push(label);
            });
        }

        subs.dispatch(&heartbeat());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_off_removes_only_the_named_handler() {
        let subs = Subscribers::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls1 = calls.clone();
        let id = subs.on(UpdateEventKind::Heartbeat, move |_| {
            calls1.fetch_add(1, Ordering::SeqCst);
        });
        let calls2 = calls.clone();
        subs.on(UpdateEventKind::Heartbeat, move |_| {
            calls2.fetch_add(10, Ordering::SeqCst);
        });

        assert!(subs.off(UpdateEventKind::Heartbeat, id));
        assert!(!subs.off(UpdateEventKind::Heartbeat, id), "second off is a no-op");

        subs.dispatch(&heartbeat());
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_dispatch() {
        let subs = Subscribers::new();
        let calls = Arc::new(AtomicUsize::new(0));

        subs.on(UpdateEventKind::Heartbeat, |_| {
            panic!("subscriber bug");
        });
        let calls2 = calls.clone();
        subs.on(UpdateEventKind::Heartbeat, move |_| {
            calls2.fetch_add(1, Ordering::SeqCst);
        });

        subs.dispatch(&heartbeat());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself_mid_dispatch() {
        let subs = Subscribers::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let subs_inner = subs.clone();
        let id_cell: Arc<Mutex<Option<HandlerId>>> = Arc::new(Mutex::new(None));
        let id_cell2 = id_cell.clone();
        let calls1 = calls.clone();
        let id = subs.on(UpdateEventKind::Heartbeat, move |_| {
            calls1.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *id_cell2.lock().unwrap() {
                subs_inner.off(UpdateEventKind::Heartbeat, id);
            }
        });
        *id_cell.lock().unwrap() = Some(id);

        let calls2 = calls.clone();
        subs.on(UpdateEventKind::Heartbeat, move |_| {
            calls2.fetch_add(1, Ordering::SeqCst);
        });

        // First dispatch: both handlers run, first one removes itself.
        subs.dispatch(&heartbeat());
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Second dispatch: only the survivor runs.
        subs.dispatch(&heartbeat());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_clear_drops_all_registrations() {
        let subs = Subscribers::new();
        subs.on(UpdateEventKind::Heartbeat, |_| {});
        subs.on(UpdateEventKind::MatchUpdate, |_| {});
        subs.clear();
        assert_eq!(subs.handler_count(UpdateEventKind::Heartbeat), 0);
        assert_eq!(subs.handler_count(UpdateEventKind::MatchUpdate), 0);
    }

    #[test]
    fn test_unknown_events_are_never_dispatched() {
        let subs = Subscribers::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls1 = calls.clone();
        subs.on(UpdateEventKind::Error, move |_| {
            calls1.fetch_add(1, Ordering::SeqCst);
        });

        subs.dispatch(&UpdateEvent::Unknown {
            raw_type: "mystery".to_string(),
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
