use std::fmt;

use tracing::trace;

/// Change notifications emitted by [`RaggedTable`](super::table::RaggedTable).
///
/// All indices are 1-based. Ranges are expressed as `(first, count)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangeEvent {
    /// A single existing cell was overwritten
    ElementChanged { row: usize, col: usize },
    ElementInserted { row: usize, col: usize },
    ElementRemoved { row: usize, col: usize },
    RowsInserted { first: usize, count: usize },
    RowsRemoved { first: usize, count: usize },
    ColsInserted { first: usize, count: usize },
    ColsRemoved { first: usize, count: usize },
    RowMoved { from: usize, to: usize },
    ColMoved { from: usize, to: usize },
    RowDuplicated { from: usize, to: usize },
    ColDuplicated { from: usize, to: usize },
    /// Fired once when broadcasting is switched back on after a bulk update
    DataReloaded,
}

/// Handle returned by [`Broadcaster::subscribe`], used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&ChangeEvent)>;

/// Ordered list of change listeners. Listeners are called in registration order.
pub struct Broadcaster {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
    enabled: bool,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 1,
            enabled: true,
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the id was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle delivery. Switching from off to on delivers a single `DataReloaded`.
    pub fn set_enabled(&mut self, on: bool) {
        let was_on = self.enabled;
        self.enabled = on;
        if !was_on && on {
            self.emit(ChangeEvent::DataReloaded);
        }
    }

    /// Deliver an event to every listener, unless delivery is suppressed.
    pub fn emit(&mut self, event: ChangeEvent) {
        if !self.enabled {
            return;
        }
        trace!(?event, listeners = self.listeners.len(), "table change");
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("listeners", &self.listeners.len())
            .field("enabled", &self.enabled)
            .finish()
    }
}
