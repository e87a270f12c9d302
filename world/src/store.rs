//! Keyed tables backing the world store.
//!
//! A [`Table`] is a dumb container: it keeps rows ordered by key and records
//! whether anything changed since the last time the flag was taken. Foreign
//! key consistency is enforced by the tick systems, never by the table.

use std::collections::BTreeMap;

use colony_wars_core::TableName;
use serde::{de::DeserializeOwned, Serialize};

/// Record stored inside a [`Table`].
pub trait Row: Clone + Serialize + DeserializeOwned {
    /// Primary key type of the record.
    type Key: Ord + Clone;

    /// Table the record lives in.
    const TABLE: TableName;

    /// Primary key of the record.
    fn key(&self) -> Self::Key;
}

/// Ordered collection of rows sharing a key type.
#[derive(Clone, Debug)]
pub struct Table<R: Row> {
    rows: BTreeMap<R::Key, R>,
    dirty: bool,
}

impl<R: Row> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            dirty: false,
        }
    }
}

impl<R: Row> Table<R> {
    /// Creates a table pre-populated with the provided rows.
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = R>) -> Self {
        Self {
            rows: rows.into_iter().map(|row| (row.key(), row)).collect(),
            dirty: false,
        }
    }

    /// Inserts a row, replacing any row that shares its key.
    pub fn insert(&mut self, row: R) {
        let _ = self.rows.insert(row.key(), row);
        self.dirty = true;
    }

    /// Looks up a row by key.
    #[must_use]
    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.rows.get(key)
    }

    /// Looks up a row for modification.
    ///
    /// The table is marked dirty whenever the row exists, whether or not the
    /// caller ends up changing it.
    pub fn get_mut(&mut self, key: &R::Key) -> Option<&mut R> {
        let row = self.rows.get_mut(key);
        if row.is_some() {
            self.dirty = true;
        }
        row
    }

    /// Applies `patch` to the row identified by `key`, returning whether it existed.
    pub fn update(&mut self, key: &R::Key, patch: impl FnOnce(&mut R)) -> bool {
        match self.get_mut(key) {
            Some(row) => {
                patch(row);
                true
            }
            None => false,
        }
    }

    /// Removes the row identified by `key`.
    pub fn remove(&mut self, key: &R::Key) -> Option<R> {
        let removed = self.rows.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Keeps only the rows matching `keep`, returning how many were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&R) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|_, row| keep(row));
        let removed = before - self.rows.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// Removes every row.
    pub fn clear(&mut self) {
        if !self.rows.is_empty() {
            self.dirty = true;
        }
        self.rows.clear();
    }

    /// Reports whether a row with the key exists.
    #[must_use]
    pub fn contains(&self, key: &R::Key) -> bool {
        self.rows.contains_key(key)
    }

    /// Iterates rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = &R> + '_ {
        self.rows.values()
    }

    /// Iterates rows mutably in key order, marking the table dirty.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut R> + '_ {
        if !self.rows.is_empty() {
            self.dirty = true;
        }
        self.rows.values_mut()
    }

    /// Collects the rows matching `predicate`.
    #[must_use]
    pub fn query(&self, mut predicate: impl FnMut(&R) -> bool) -> Vec<&R> {
        self.rows.values().filter(|row| predicate(row)).collect()
    }

    /// Snapshot of every key, for iterate-then-mutate passes.
    #[must_use]
    pub fn keys(&self) -> Vec<R::Key> {
        self.rows.keys().cloned().collect()
    }

    /// Number of rows stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Reports whether the table holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Clones every row in key order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<R> {
        self.rows.values().cloned().collect()
    }

    /// Reports whether the table changed since the flag was last taken.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns and clears the change flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Table the rows belong to.
    #[must_use]
    pub fn name(&self) -> TableName {
        R::TABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: u32,
        value: i32,
    }

    impl Row for Sample {
        type Key = u32;
        const TABLE: TableName = TableName::Obstacle;

        fn key(&self) -> u32 {
            self.id
        }
    }

    #[test]
    fn rows_iterate_in_key_order() {
        let mut table = Table::default();
        table.insert(Sample { id: 3, value: 30 });
        table.insert(Sample { id: 1, value: 10 });
        table.insert(Sample { id: 2, value: 20 });

        let values: Vec<i32> = table.iter().map(|row| row.value).collect();
        assert_eq!(values, vec![10, 20, 30]);
        assert_eq!(table.keys(), vec![1, 2, 3]);
    }

    #[test]
    fn dirty_flag_tracks_mutation_only() {
        let mut table = Table::from_rows([Sample { id: 1, value: 1 }]);
        assert!(!table.is_dirty());

        assert!(table.get(&1).is_some());
        assert!(!table.is_dirty());

        assert!(!table.update(&7, |row| row.value = 0));
        assert!(!table.is_dirty());

        assert!(table.update(&1, |row| row.value = 5));
        assert!(table.take_dirty());
        assert!(!table.is_dirty());

        assert_eq!(table.retain(|row| row.value != 5), 1);
        assert!(table.take_dirty());
        assert!(table.is_empty());
    }
}
