// SPDX-License-Identifier: Apache-2.0
//! Generic sorted-by-id record registry.
//!
//! Every entity registry in the kernel shares one discipline: records are
//! stored sorted ascending by their primary id, duplicate ids are rejected,
//! capacity is bounded, and iteration visits records in id order. That
//! order is part of the determinism contract — subsystems that iterate a
//! registry must see the same sequence on every machine.

use thiserror::Error;

/// Errors shared by id-keyed registries.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Zero is reserved as "no id" everywhere in the kernel.
    #[error("zero id")]
    InvalidId,
    /// A record with this id already exists.
    #[error("duplicate id")]
    DuplicateId,
    /// The registry is at capacity.
    #[error("registry full")]
    Full,
    /// No record with the requested id.
    #[error("id not found")]
    NotFound,
}

/// Records stored in a [`Registry`] expose their primary key.
pub trait Keyed {
    /// Primary id; must be nonzero and stable for the record's lifetime.
    fn key(&self) -> u64;
}

/// Capacity-bounded, id-sorted record store.
#[derive(Debug, Clone)]
pub struct Registry<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T: Keyed> Registry<T> {
    /// Creates an empty registry bounded at `capacity` records.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bound on record count.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when no further record can be inserted.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Inserts a record at its sorted position.
    pub fn insert(&mut self, item: T) -> Result<(), RegistryError> {
        if item.key() == 0 {
            return Err(RegistryError::InvalidId);
        }
        if self.is_full() {
            return Err(RegistryError::Full);
        }
        match self.items.binary_search_by_key(&item.key(), Keyed::key) {
            Ok(_) => Err(RegistryError::DuplicateId),
            Err(idx) => {
                self.items.insert(idx, item);
                Ok(())
            }
        }
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&T> {
        self.items
            .binary_search_by_key(&id, Keyed::key)
            .ok()
            .map(|idx| &self.items[idx])
    }

    /// Looks up a record by id for mutation. Callers must not change the
    /// record's key.
    #[must_use]
    pub fn get_mut(&mut self, id: u64) -> Option<&mut T> {
        match self.items.binary_search_by_key(&id, Keyed::key) {
            Ok(idx) => Some(&mut self.items[idx]),
            Err(_) => None,
        }
    }

    /// Removes and returns the record with `id`.
    pub fn remove(&mut self, id: u64) -> Result<T, RegistryError> {
        match self.items.binary_search_by_key(&id, Keyed::key) {
            Ok(idx) => Ok(self.items.remove(idx)),
            Err(_) => Err(RegistryError::NotFound),
        }
    }

    /// Iterates records in ascending id order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Iterates records mutably in ascending id order. Callers must not
    /// change record keys.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a, T: Keyed> IntoIterator for &'a Registry<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Rec(u64, &'static str);

    impl Keyed for Rec {
        fn key(&self) -> u64 {
            self.0
        }
    }

    #[test]
    fn insertion_keeps_id_order() {
        let mut reg = Registry::with_capacity(8);
        reg.insert(Rec(30, "c")).unwrap();
        reg.insert(Rec(10, "a")).unwrap();
        reg.insert(Rec(20, "b")).unwrap();
        let ids: Vec<u64> = reg.iter().map(|r| r.0).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn duplicate_and_zero_ids_rejected() {
        let mut reg = Registry::with_capacity(8);
        reg.insert(Rec(1, "a")).unwrap();
        assert_eq!(reg.insert(Rec(1, "b")).unwrap_err(), RegistryError::DuplicateId);
        assert_eq!(reg.insert(Rec(0, "z")).unwrap_err(), RegistryError::InvalidId);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut reg = Registry::with_capacity(1);
        reg.insert(Rec(1, "a")).unwrap();
        assert_eq!(reg.insert(Rec(2, "b")).unwrap_err(), RegistryError::Full);
    }

    #[test]
    fn remove_returns_record() {
        let mut reg = Registry::with_capacity(4);
        reg.insert(Rec(5, "x")).unwrap();
        assert_eq!(reg.remove(5).unwrap(), Rec(5, "x"));
        assert_eq!(reg.remove(5).unwrap_err(), RegistryError::NotFound);
    }
}
