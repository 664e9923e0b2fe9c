// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::task::TaskId;

#[test]
fn short_truncates_long_strings() {
    assert_eq!(short("abcdefgh", 4), "abcd");
}

#[test]
fn short_leaves_short_strings_alone() {
    assert_eq!(short("abc", 10), "abc");
}

#[test]
fn generated_ids_carry_prefix_and_are_unique() {
    let a = TaskId::new();
    let b = TaskId::new();
    assert!(a.as_str().starts_with(TaskId::PREFIX));
    assert_ne!(a, b);
}

#[test]
fn from_string_accepts_external_ids() {
    let id = TaskId::from_string("bug-1234");
    assert_eq!(id, "bug-1234");
    assert!(!id.is_empty());
}

#[test]
fn ids_roundtrip_through_serde_as_plain_strings() {
    let id = TaskId::from_string("task-abc");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"task-abc\"");
    let back: TaskId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
