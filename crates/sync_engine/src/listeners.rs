//! Per-kind listener lists for engine-emitted events.

use std::fmt;
use std::sync::Arc;

use contracts::{ListenerId, SyncEvent, SyncEventKind};

/// Engine event handler type
pub type SyncEventHandler = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

struct Registration {
    id: ListenerId,
    kind: SyncEventKind,
    handler: SyncEventHandler,
}

/// Observer list with registration-order fan-out and removal by identity
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    registrations: Vec<Registration>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.registrations.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`; ids are never reused
    pub fn add(&mut self, kind: SyncEventKind, handler: SyncEventHandler) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration { id, kind, handler });
        id
    }

    /// Remove a registration; returns false for unknown ids or a kind mismatch
    pub fn remove(&mut self, kind: SyncEventKind, id: ListenerId) -> bool {
        let before = self.registrations.len();
        self.registrations
            .retain(|registration| !(registration.id == id && registration.kind == kind));
        self.registrations.len() != before
    }

    /// Snapshot of the handlers for `kind`, in registration order
    pub fn handlers_for(&self, kind: SyncEventKind) -> Vec<SyncEventHandler> {
        self.registrations
            .iter()
            .filter(|registration| registration.kind == kind)
            .map(|registration| Arc::clone(&registration.handler))
            .collect()
    }

    pub fn clear(&mut self) {
        self.registrations.clear();
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
