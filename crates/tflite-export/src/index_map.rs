// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Bidirectional value ↔ dense index map.
//!
//! The first insertion of a value fixes its index for the lifetime of the
//! map; later insertions of an equal value are no-ops. Indices therefore
//! follow first-seen order and are dense in `[0, len)`.

use crate::ExportError;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Assigns stable, insertion-ordered `u32` indices to unique values.
///
/// `T` is cloned once per unique value (one copy in each direction), so use
/// it with small handles: ids, enum variants, references.
#[derive(Debug, Clone)]
pub struct IndexMap<T> {
    index_of: HashMap<T, u32>,
    values: Vec<T>,
}

impl<T> Default for IndexMap<T> {
    fn default() -> Self {
        Self {
            index_of: HashMap::new(),
            values: Vec::new(),
        }
    }
}

impl<T: Eq + Hash + Clone + Debug> IndexMap<T> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` if unseen and returns its index.
    pub fn add(&mut self, value: T) -> u32 {
        if let Some(&index) = self.index_of.get(&value) {
            return index;
        }
        let index = self.values.len() as u32;
        self.index_of.insert(value.clone(), index);
        self.values.push(value);
        index
    }

    /// Returns the index assigned to `value`.
    pub fn index_of(&self, value: &T) -> Result<u32, ExportError> {
        self.index_of
            .get(value)
            .copied()
            .ok_or_else(|| ExportError::KeyNotFound(format!("{value:?}")))
    }

    /// Returns the value inserted at `index`.
    pub fn value_at(&self, index: u32) -> Result<&T, ExportError> {
        self.values
            .get(index as usize)
            .ok_or(ExportError::IndexOutOfRange {
                index,
                len: self.values.len(),
            })
    }

    /// Returns `true` if `value` has been inserted.
    pub fn contains(&self, value: &T) -> bool {
        self.index_of.contains_key(value)
    }

    /// Number of unique values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over values in index order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_insertion_order() {
        let mut map = IndexMap::new();
        for v in ["c", "a", "b"] {
            map.add(v);
        }
        assert_eq!(map.index_of(&"c").unwrap(), 0);
        assert_eq!(map.index_of(&"a").unwrap(), 1);
        assert_eq!(map.index_of(&"b").unwrap(), 2);
        assert_eq!(map.iter().copied().collect::<Vec<_>>(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_value_at_inverts_index_of() {
        let mut map = IndexMap::new();
        let values: Vec<u64> = (0..50).map(|i| i * 7919 % 101).collect();
        for &v in &values {
            map.add(v);
        }
        for v in &values {
            let index = map.index_of(v).unwrap();
            assert_eq!(map.value_at(index).unwrap(), v);
        }
    }

    #[test]
    fn test_reinsert_is_idempotent() {
        let mut map = IndexMap::new();
        assert_eq!(map.add('x'), 0);
        assert_eq!(map.add('y'), 1);
        assert_eq!(map.add('x'), 0);
        assert_eq!(map.len(), 2);
        assert_eq!(map.index_of(&'x').unwrap(), 0);
    }

    #[test]
    fn test_missing_key() {
        let mut map = IndexMap::new();
        map.add(1u32);
        let err = map.index_of(&2).unwrap_err();
        assert!(matches!(err, ExportError::KeyNotFound(_)));
        assert_eq!(map.len(), 1);
        assert!(!map.contains(&2));
    }

    #[test]
    fn test_index_out_of_range() {
        let mut map = IndexMap::new();
        map.add("only");
        assert!(map.value_at(0).is_ok());
        let err = map.value_at(1).unwrap_err();
        assert!(matches!(err, ExportError::IndexOutOfRange { index: 1, len: 1 }));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_empty_map() {
        let map: IndexMap<u8> = IndexMap::new();
        assert!(map.is_empty());
        assert!(map.value_at(0).is_err());
    }
}
