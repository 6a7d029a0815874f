// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide lookup-by-id registry, replacing the source's intrusive
//! aggregator/subscription lists.
//!
//! Generalizes the teacher's `engine::demux::TopicRegistry` (an
//! `RwLock<HashMap<String, Topic>>` with poison-recovery helpers) from a
//! topic-keyed registry to a registry generic over any hashable `Id`. The
//! contract requires "first registered wins" for duplicate ids (source
//! silently allows duplicate `parameterId`s and only the first is
//! findable), so `register` is a no-op insert-if-absent rather than the
//! teacher's overwrite-on-reinsert.
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;

/// A process-wide registry mapping `Id` to `T`, tolerant of duplicate ids.
pub struct Registry<Id, T> {
    entries: RwLock<HashMap<Id, T>>,
}

impl<Id, T> Default for Registry<Id, T>
where
    Id: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<Id, T> Registry<Id, T>
where
    Id: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `value` under `id`. If `id` is already registered, the
    /// existing entry is kept and `false` is returned: the contract's
    /// "only the first is findable" rule for duplicate ids.
    pub fn register(&self, id: Id, value: T) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(&id) {
            return false;
        }
        entries.insert(id, value);
        true
    }

    /// Removes the entry for `id`, if any. Returns whether one was present.
    pub fn unregister(&self, id: &Id) -> bool {
        self.entries.write().remove(id).is_some()
    }

    /// Number of distinct registered ids.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the registry currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<Id, T> Registry<Id, T>
where
    Id: Eq + Hash,
    T: Clone,
{
    /// Looks up the entry registered under `id`. `None` if absent.
    pub fn find(&self, id: &Id) -> Option<T> {
        self.entries.read().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_find_round_trips() {
        let reg: Registry<u16, &'static str> = Registry::new();
        assert!(reg.register(1, "alpha"));
        assert_eq!(reg.find(&1), Some("alpha"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_id_keeps_first_registration() {
        let reg: Registry<u16, &'static str> = Registry::new();
        assert!(reg.register(1, "first"));
        assert!(!reg.register(1, "second"), "duplicate id must be rejected");
        assert_eq!(reg.find(&1), Some("first"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unregister_then_re_register_succeeds() {
        let reg: Registry<u16, &'static str> = Registry::new();
        reg.register(1, "alpha");
        assert!(reg.unregister(&1));
        assert_eq!(reg.find(&1), None);
        assert!(reg.register(1, "beta"));
        assert_eq!(reg.find(&1), Some("beta"));
    }

    #[test]
    fn find_missing_id_is_none() {
        let reg: Registry<u16, &'static str> = Registry::new();
        assert_eq!(reg.find(&99), None);
        assert!(reg.is_empty());
    }
}
