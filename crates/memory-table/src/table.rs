// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The name → value registry.
//!
//! A [`MemoryTable`] is owned by exactly one replay run. It has no capacity
//! limit and no internal locking: the interpreter is single-threaded and
//! holds the table by `&mut`.

use std::collections::{BTreeSet, HashMap};

use crate::{TableError, TableStats};

/// Registry of live, symbolically named values.
#[derive(Debug)]
pub struct MemoryTable<V> {
    entries: HashMap<String, V>,
    stats: TableStats,
}

impl<V> Default for MemoryTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryTable<V> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            stats: TableStats::default(),
        }
    }

    /// Binds `name` to `value`, replacing any live entry.
    ///
    /// Returns the displaced value so the caller decides when its claim ends.
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> Option<V> {
        let name = name.into();
        let previous = self.entries.insert(name, value);
        self.stats
            .record_insert(previous.is_some(), self.entries.len());
        previous
    }

    /// Resolves `name`.
    ///
    /// # Errors
    /// [`TableError::MissingReference`] if the name is not live.
    pub fn lookup(&self, name: &str) -> Result<&V, TableError> {
        self.entries.get(name).ok_or_else(|| missing(name))
    }

    /// Unbinds `name` and returns its value.
    ///
    /// # Errors
    /// [`TableError::MissingReference`] if the name is not live.
    pub fn remove(&mut self, name: &str) -> Result<V, TableError> {
        let value = self.entries.remove(name).ok_or_else(|| missing(name))?;
        self.stats.record_removal();
        Ok(value)
    }

    /// Returns `true` if `name` is live.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted snapshot of the live names.
    pub fn live_names(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn stats(&self) -> &TableStats {
        &self.stats
    }
}

fn missing(name: &str) -> TableError {
    TableError::MissingReference {
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_insert_then_lookup() {
        let mut t = MemoryTable::new();
        assert!(t.insert("a", 10).is_none());
        assert_eq!(*t.lookup("a").unwrap(), 10);
        assert!(t.contains("a"));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_overwrite_replaces_and_returns_old() {
        let mut t = MemoryTable::new();
        t.insert("a", 1);
        assert_eq!(t.insert("a", 2), Some(1));
        assert_eq!(*t.lookup("a").unwrap(), 2);
        assert_eq!(t.len(), 1);
        assert_eq!(t.stats().overwrites, 1);
    }

    #[test]
    fn test_remove_then_lookup_fails() {
        let mut t = MemoryTable::new();
        t.insert("a", 1);
        assert_eq!(t.remove("a").unwrap(), 1);
        assert_eq!(
            t.lookup("a").unwrap_err(),
            TableError::MissingReference { name: "a".into() }
        );
    }

    #[test]
    fn test_remove_absent_fails() {
        let mut t: MemoryTable<i32> = MemoryTable::new();
        let err = t.remove("ghost").unwrap_err();
        assert!(err.to_string().contains("ghost"));
        assert_eq!(t.stats().removals, 0);
    }

    #[test]
    fn test_overwrite_drops_only_one_claim() {
        let shared = Rc::new(5);
        let mut t = MemoryTable::new();
        t.insert("a", Rc::clone(&shared));
        t.insert("b", Rc::clone(&shared));
        assert_eq!(Rc::strong_count(&shared), 3);
        drop(t.insert("a", Rc::new(6)));
        assert_eq!(Rc::strong_count(&shared), 2);
        assert_eq!(**t.lookup("b").unwrap(), 5);
    }

    #[test]
    fn test_live_names_sorted() {
        let mut t = MemoryTable::new();
        t.insert("z", ());
        t.insert("a", ());
        t.insert("m", ());
        t.remove("m").unwrap();
        let names: Vec<_> = t.live_names().into_iter().collect();
        assert_eq!(names, vec!["a".to_string(), "z".to_string()]);
        assert_eq!(t.stats().peak_live, 3);
    }
}
