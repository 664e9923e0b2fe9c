// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[cfg(unix)]
#[tokio::test]
async fn terminating_a_dead_group_is_ok() {
    // Spawn a child in its own process group, let it exit, then terminate.
    use std::os::unix::process::CommandExt;
    let mut cmd = std::process::Command::new("true");
    cmd.process_group(0);
    let mut child = cmd.spawn().unwrap();
    let pid = child.id() as i32;
    child.wait().unwrap();

    // The group may already be fully reaped; either way this must not error.
    let result = terminate_process_group(pid).await;
    assert!(result.is_ok(), "got {result:?}");
}

#[cfg(unix)]
#[tokio::test]
async fn terminating_a_live_group_kills_it() {
    use std::os::unix::process::CommandExt;
    let mut cmd = std::process::Command::new("sleep");
    cmd.arg("30").process_group(0);
    let mut child = cmd.spawn().unwrap();
    let pid = child.id() as i32;

    terminate_process_group(pid).await.unwrap();

    let status = child.wait().unwrap();
    assert!(!status.success());
}
