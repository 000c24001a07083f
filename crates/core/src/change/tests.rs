// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use super::*;

fn new_map() -> ChangeTrackingMap<&'static str, u32> {
    [("a", 1), ("b", 2)].into_iter().collect()
}

#[test]
fn set_then_get() {
    let mut map = new_map();
    for (key, value) in [("a", 10), ("b", 2), ("c", 30)] {
        map.set(key, Some(value));
        assert_eq!(Some(&value), map.get(key));
    }
}

#[test]
fn remove_missing_key_is_a_noop() {
    let mut map = new_map();
    map.set("c", Some(3));
    assert!(map.has_changes());
    map.set("c", None);
    assert_eq!(None, map.get("c"));
    assert!(!map.pending().contains_key("c"));
    assert!(!map.has_changes());
    assert_eq!(ChangeState::Absent, map.state("c"));
}

#[test]
fn remove_existing_key_until_reverted() {
    let mut map = new_map();
    map.set("a", None);
    assert_eq!(None, map.get("a"));
    assert_eq!(ChangeState::Deleted, map.state("a"));
    assert_eq!(Some(&Change::Deleted), map.pending().get("a"));
    assert_eq!(1, map.len());

    map.revert_changes();
    assert_eq!(Some(&1), map.get("a"));
    assert_eq!(ChangeState::Unchanged(&1), map.state("a"));
    assert_eq!(2, map.len());
}

#[test]
fn setting_the_base_value_discards_the_change() {
    let mut map = new_map();
    map.set("a", Some(5));
    assert_eq!(ChangeState::Changed(&5), map.state("a"));
    map.set("a", Some(1));
    assert!(map.pending().is_empty());
    assert_eq!(ChangeState::Unchanged(&1), map.state("a"));

    // Re-adding a deleted value also discards the change
    map.set("b", None);
    map.set("b", Some(2));
    assert!(map.pending().is_empty());
}

#[test]
fn merge_changes() {
    let mut map = new_map();
    map.set("a", None);
    map.set("b", Some(20));
    map.set("c", Some(30));
    map.merge_changes();
    assert!(!map.has_changes());
    assert_eq!(None, map.base().get("a"));
    assert_eq!(Some(&20), map.base().get("b"));
    assert_eq!(Some(&30), map.base().get("c"));
}

#[test]
fn revert_after_merge_does_not_change_visible_entries() {
    let mut map = new_map();
    map.set("a", None);
    map.set("c", Some(3));
    let before = map
        .iter()
        .map(|(key, value)| (*key, *value))
        .collect::<std::collections::BTreeMap<_, _>>();
    map.merge_changes();
    map.revert_changes();
    let after = map
        .iter()
        .map(|(key, value)| (*key, *value))
        .collect::<std::collections::BTreeMap<_, _>>();
    assert_eq!(before, after);
}

#[test]
fn clear_marks_all_base_entries_as_deleted() {
    let mut map = new_map();
    map.set("c", Some(3));
    map.clear();
    assert!(map.is_empty());
    assert_eq!(2, map.pending().len());
    assert!(map.pending().values().all(Change::is_deleted));
    map.merge_changes();
    assert!(map.base().is_empty());
}

#[test]
fn iter_visits_unchanged_and_changed_entries() {
    let mut map = new_map();
    map.set("b", Some(20));
    map.set("c", Some(30));
    let mut entries = map
        .iter()
        .map(|(key, value)| (*key, *value))
        .collect::<Vec<_>>();
    entries.sort_unstable();
    assert_eq!(vec![("a", 1), ("b", 20), ("c", 30)], entries);
}
