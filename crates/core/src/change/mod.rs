// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Change tracking for key/value maps.
//!
//! A [`ChangeTrackingMap`] keeps the last saved state of a map (the *base*)
//! separately from the edits that have not been saved yet (the *pending*
//! changes). Pending changes shadow the base on lookup. They are either
//! merged into the base after they have been persisted or reverted.

use std::{borrow::Borrow, hash::Hash};

use hashbrown::HashMap;

/// A pending edit of a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<V> {
    /// Replaces or inserts the value.
    Set(V),

    /// Removes the existing value from the base map.
    Deleted,
}

impl<V> Change<V> {
    #[must_use]
    pub const fn value(&self) -> Option<&V> {
        match self {
            Self::Set(value) => Some(value),
            Self::Deleted => None,
        }
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// The effective state of a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeState<'a, V> {
    /// Present in the base map without pending changes.
    Unchanged(&'a V),

    /// Pending value that replaces or extends the base map.
    Changed(&'a V),

    /// Present in the base map but pending deletion.
    Deleted,

    /// Neither in the base map nor pending.
    Absent,
}

impl<'a, V> ChangeState<'a, V> {
    /// The value that is visible for the key.
    #[must_use]
    pub const fn value(self) -> Option<&'a V> {
        match self {
            Self::Unchanged(value) | Self::Changed(value) => Some(value),
            Self::Deleted | Self::Absent => None,
        }
    }

    #[must_use]
    pub const fn is_changed(self) -> bool {
        matches!(self, Self::Changed(_) | Self::Deleted)
    }
}

/// Base map with an overlay of pending changes.
///
/// Invariant: A key that is marked as [`Change::Deleted`] in the
/// pending changes is also contained in the base map.
#[derive(Debug, Clone)]
pub struct ChangeTrackingMap<K, V> {
    base: HashMap<K, V>,
    pending: HashMap<K, Change<V>>,
}

impl<K, V> Default for ChangeTrackingMap<K, V> {
    fn default() -> Self {
        Self {
            base: HashMap::new(),
            pending: HashMap::new(),
        }
    }
}

impl<K, V> ChangeTrackingMap<K, V>
where
    K: Eq + Hash,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map from a saved snapshot without pending changes.
    #[must_use]
    pub fn from_base(base: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            base: base.into_iter().collect(),
            pending: HashMap::new(),
        }
    }

    /// The last saved state.
    #[must_use]
    pub fn base(&self) -> &HashMap<K, V> {
        &self.base
    }

    /// Changes that have neither been merged nor reverted yet.
    #[must_use]
    pub fn pending(&self) -> &HashMap<K, Change<V>> {
        &self.pending
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.state(key).value()
    }

    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn state<Q>(&self, key: &Q) -> ChangeState<'_, V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if let Some(change) = self.pending.get(key) {
            return match change {
                Change::Set(value) => ChangeState::Changed(value),
                Change::Deleted => {
                    debug_assert!(self.base.contains_key(key));
                    ChangeState::Deleted
                }
            };
        }
        self.base
            .get(key)
            .map_or(ChangeState::Absent, ChangeState::Unchanged)
    }

    /// Iterates over all visible entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        let unchanged = self
            .base
            .iter()
            .filter(|(key, _)| !self.pending.contains_key(*key));
        let changed = self
            .pending
            .iter()
            .filter_map(|(key, change)| change.value().map(|value| (key, value)));
        unchanged.chain(changed)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Merges all pending changes into the base.
    ///
    /// Should be invoked after the current state has been saved.
    pub fn merge_changes(&mut self) {
        for (key, change) in self.pending.drain() {
            match change {
                Change::Set(value) => {
                    self.base.insert(key, value);
                }
                Change::Deleted => {
                    let removed = self.base.remove(&key);
                    debug_assert!(removed.is_some());
                }
            }
        }
    }

    /// Discards all pending changes.
    pub fn revert_changes(&mut self) {
        self.pending.clear();
    }
}

impl<K, V> ChangeTrackingMap<K, V>
where
    K: Eq + Hash,
    V: PartialEq,
{
    /// Sets or removes a value.
    ///
    /// Setting the value that is already stored in the base map
    /// cancels any pending change for the key.
    pub fn set(&mut self, key: K, value: Option<V>) {
        let Some(value) = value else {
            if self.base.contains_key(&key) {
                self.pending.insert(key, Change::Deleted);
            } else {
                self.pending.remove(&key);
            }
            return;
        };
        if self.base.get(&key) == Some(&value) {
            self.pending.remove(&key);
        } else {
            self.pending.insert(key, Change::Set(value));
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.set(key, Some(value));
    }

    pub fn remove(&mut self, key: K) {
        self.set(key, None);
    }
}

impl<K, V> ChangeTrackingMap<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Marks every visible entry for removal.
    pub fn clear(&mut self) {
        self.pending.clear();
        for key in self.base.keys() {
            self.pending.insert(key.clone(), Change::Deleted);
        }
    }
}

impl<K, V> PartialEq for ChangeTrackingMap<K, V>
where
    K: Eq + Hash,
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.pending == other.pending
    }
}

impl<K, V> FromIterator<(K, V)> for ChangeTrackingMap<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_base(iter)
    }
}

///////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests;
