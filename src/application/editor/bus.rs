//! Change notification for UI chrome that reacts to component edits.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;

use crate::domain::ids::ComponentId;

use super::registry::ComponentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// An existing node was registered explicitly.
    Registered,
    Inserted,
    Updated,
    Duplicated,
    /// The record is gone; `record` carries its last state.
    Removed,
}

#[derive(Debug, Clone, Copy)]
pub struct ComponentChange<'a> {
    pub kind: ChangeKind,
    pub id: &'a ComponentId,
    pub record: &'a ComponentRecord,
}

type Listener = Box<dyn FnMut(&ComponentChange<'_>)>;

/// Ordered listener list. Each call is isolated: a panicking listener is
/// logged and the remaining listeners still run.
#[derive(Default)]
pub struct ChangeBus {
    next_id: u64,
    listeners: Vec<(ListenerId, Listener)>,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ComponentChange<'_>) + 'static) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Notify every listener in subscription order. Returns how many panicked.
    pub fn emit(&mut self, change: &ComponentChange<'_>) -> usize {
        let mut panicked = 0;
        for (id, listener) in &mut self.listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| listener(change)));
            if outcome.is_err() {
                panicked += 1;
                warn!(
                    listener = id.0,
                    component_id = %change.id,
                    change = ?change.kind,
                    "change listener panicked"
                );
            }
        }
        panicked
    }
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
