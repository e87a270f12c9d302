//! Per-table subscriptions notified with full table contents.

use std::collections::BTreeMap;

use colony_wars_core::TableName;
use colony_wars_world::{snapshot, World};
use serde_json::Value;
use tracing::warn;

/// Current rows of one table handed to listeners.
#[derive(Clone, Copy, Debug)]
pub struct TableSnapshot<'a> {
    /// Table the rows belong to.
    pub table: TableName,
    /// JSON array of every row.
    pub rows: &'a Value,
}

impl TableSnapshot<'_> {
    /// Number of rows in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.as_array().map_or(0, Vec::len)
    }

    /// Reports whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Callback registered for one table.
pub type Listener = Box<dyn FnMut(TableSnapshot<'_>) + Send>;

/// Fans table changes out to registered listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: BTreeMap<TableName, Vec<Listener>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<TableName, usize> = self
            .listeners
            .iter()
            .map(|(table, listeners)| (*table, listeners.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

impl EventBus {
    /// Creates a bus without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for `table`.
    pub fn on(&mut self, table: TableName, listener: Listener) {
        self.listeners.entry(table).or_default().push(listener);
    }

    /// Number of listeners registered for `table`.
    #[must_use]
    pub fn listener_count(&self, table: TableName) -> usize {
        self.listeners.get(&table).map_or(0, Vec::len)
    }

    /// Sends the current rows of each table to its listeners.
    pub fn publish(&mut self, world: &World, tables: &[TableName]) {
        for table in tables {
            let Some(listeners) = self.listeners.get_mut(table) else {
                continue;
            };
            if listeners.is_empty() {
                continue;
            }
            let rows = match snapshot::table_json(world, *table) {
                Ok(rows) => rows,
                Err(error) => {
                    warn!(%table, %error, "table_encoding_failed");
                    continue;
                }
            };
            for listener in listeners.iter_mut() {
                listener(TableSnapshot {
                    table: *table,
                    rows: &rows,
                });
            }
        }
    }

    /// Publishes every table the world marked dirty and clears the marks.
    pub fn flush(&mut self, world: &mut World) -> Vec<TableName> {
        let dirty = world.take_dirty_tables();
        self.publish(world, &dirty);
        dirty
    }
}
