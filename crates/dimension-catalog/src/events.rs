//! Change notifications.
//!
//! A single listener registry, [`Observers`], is shared by the catalog and
//! the selector. Listeners run synchronously, in subscription order, once
//! the emitting component is consistent again.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::resource::Resource;
use crate::variable::Variable;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(usize);

pub type Listener<E> = Box<dyn FnMut(&E)>;

/// Registry of listeners for one event type.
pub struct Observers<E> {
    listeners: Vec<(ListenerId, Listener<E>)>,
    next_id: usize,
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&E) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the listener was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn notify(&mut self, event: &E) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Emitted by the [`Catalog`](crate::Catalog) once per batch.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    /// Resources newly stored by one `append` call.
    ResourcesAdded(Vec<Arc<Resource>>),
    /// Resources actually removed by one `remove` call.
    ResourcesRemoved(Vec<Arc<Resource>>),
}

impl CatalogEvent {
    pub fn resources(&self) -> &[Arc<Resource>] {
        match self {
            CatalogEvent::ResourcesAdded(r) | CatalogEvent::ResourcesRemoved(r) => r,
        }
    }
}

/// Emitted by a [`Selector`](crate::Selector) when its outputs change.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    SelectedVariablesChanged {
        selected: Vec<Variable>,
    },
    VisibleResourceChanged {
        resource: Option<Arc<Resource>>,
    },
    AvailableTimesChanged {
        times: Vec<DateTime<Utc>>,
    },
}
