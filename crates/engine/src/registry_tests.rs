// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn id(s: &str) -> TaskId {
    TaskId::from(s)
}

#[test]
fn reserve_then_register_then_unregister() {
    let reg = ExecutionRegistry::new();
    reg.reserve(&id("t1"), "0000000001000-000", "drover-t1", 1_000, 61_000);
    assert!(reg.is_running(&id("t1")));
    assert_eq!(reg.count(), 1);

    reg.register_run_id(&id("t1"), "run-7");
    assert_eq!(reg.get(&id("t1")).unwrap().run_id.as_deref(), Some("run-7"));

    let entry = reg.unregister(&id("t1")).unwrap();
    assert_eq!(entry.agent_tag, "drover-t1");
    assert!(!reg.is_running(&id("t1")));
    assert!(reg.unregister(&id("t1")).is_none());
}

#[test]
fn re_reserving_refreshes_the_tag_but_not_the_window() {
    let reg = ExecutionRegistry::new();
    reg.reserve(&id("t1"), "e1", "drover-t1-a", 1_000, 61_000);
    reg.reserve(&id("t1"), "e2", "drover-t1-b", 50_000, 999_000);

    let entry = reg.get(&id("t1")).unwrap();
    assert_eq!(entry.agent_tag, "drover-t1-b");
    assert_eq!(entry.execution_id, "e1");
    assert_eq!(entry.reserved_at_ms, 1_000);
    assert_eq!(entry.deadline_ms, 61_000);
}

#[test]
fn timed_out_scan_skips_marked_entries() {
    let reg = ExecutionRegistry::new();
    reg.reserve(&id("t1"), "e1", "drover-t1", 0, 10_000);
    reg.reserve(&id("t2"), "e2", "drover-t2", 0, 99_000);

    let overdue = reg.timed_out(10_000);
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].task_id, id("t1"));

    reg.mark_timed_out(&id("t1"));
    assert!(reg.timed_out(10_000).is_empty());
    // Still tracked until whoever owns the attempt unregisters it.
    assert!(reg.is_running(&id("t1")));
}

#[test]
fn clear_reports_how_many_were_dropped() {
    let reg = ExecutionRegistry::new();
    reg.reserve(&id("t1"), "e1", "drover-t1", 0, 1);
    reg.reserve(&id("t2"), "e2", "drover-t2", 0, 1);
    assert_eq!(reg.clear(), 2);
    assert_eq!(reg.count(), 0);
}

#[test]
fn id_set_matches_running_ids() {
    let reg = ExecutionRegistry::new();
    reg.reserve(&id("t1"), "e1", "drover-t1", 0, 1);
    let set = reg.running_id_set();
    assert!(set.contains(&id("t1")));
    assert_eq!(set.len(), reg.running_ids().len());
}
