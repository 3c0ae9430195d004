//! Table change notifications
//!
//! Presentation layers subscribe here and translate the notifications into
//! their own model protocol. Callbacks run synchronously on the engine's
//! context, in subscription order.

use std::fmt;
use tably_core::ColumnDescriptor;

/// What happened to the rows of the current snapshot
#[derive(Clone, Debug, PartialEq)]
pub enum RowsChanged {
    /// The whole view was rebuilt (load, reload, filter change, submit)
    Reset { row_count: usize },

    /// A row was appended at this source index
    Inserted { row: usize },

    /// The row at this source index was removed
    Removed { row: usize },

    /// One cell was overwritten
    CellUpdated { row: usize, col: usize },
}

/// Handle returned by [`TableEvents::subscribe`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type RowsCallback = Box<dyn FnMut(&RowsChanged) + Send>;
type SchemaCallback = Box<dyn FnMut(&[ColumnDescriptor]) + Send>;

struct Subscriber {
    id: SubscriptionId,
    on_rows_changed: RowsCallback,
    on_schema_changed: SchemaCallback,
}

/// Subscriber registry owned by the controller
#[derive(Default)]
pub struct TableEvents {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl fmt::Debug for TableEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableEvents")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl TableEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        on_rows_changed: impl FnMut(&RowsChanged) + Send + 'static,
        on_schema_changed: impl FnMut(&[ColumnDescriptor]) + Send + 'static,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push(Subscriber {
            id,
            on_rows_changed: Box::new(on_rows_changed),
            on_schema_changed: Box::new(on_schema_changed),
        });
        id
    }

    /// Returns `false` if the subscription was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn emit_rows_changed(&mut self, change: &RowsChanged) {
        for subscriber in &mut self.subscribers {
            (subscriber.on_rows_changed)(change);
        }
    }

    pub fn emit_schema_changed(&mut self, columns: &[ColumnDescriptor]) {
        for subscriber in &mut self.subscribers {
            (subscriber.on_schema_changed)(columns);
        }
    }
}
