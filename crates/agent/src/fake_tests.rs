// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn start(task_id: &str) -> StartRun {
    StartRun {
        task_id: task_id.into(),
        prompt: "do the thing".into(),
        timeout_secs: 60,
        tag: format!("drover-{task_id}"),
    }
}

#[tokio::test]
async fn unscripted_runs_succeed_immediately() {
    let svc = FakeAgentService::new();
    let run_id = svc.execute_task_async(start("t1")).await.unwrap();
    let run = svc.wait_for_run(&run_id).await.unwrap();
    assert_eq!(run.status, RunStatus::Complete);
}

#[tokio::test]
async fn scripted_outcomes_are_consumed_in_order() {
    let svc = FakeAgentService::new();
    svc.script("t1", ScriptedRun::failed("boom"));
    svc.script("t1", ScriptedRun::success("second try"));

    let r1 = svc.execute_task_async(start("t1")).await.unwrap();
    assert_eq!(svc.wait_for_run(&r1).await.unwrap().status, RunStatus::Failed);

    let r2 = svc.execute_task_async(start("t1")).await.unwrap();
    let run = svc.wait_for_run(&r2).await.unwrap();
    assert_eq!(run.status, RunStatus::Complete);
    assert_eq!(run.summary, "second try");
}

#[tokio::test]
async fn stop_interrupts_a_long_run() {
    let svc = Arc::new(FakeAgentService::new());
    svc.script("t1", ScriptedRun::success("slow").running_for(Duration::from_secs(30)));
    let run_id = svc.execute_task_async(start("t1")).await.unwrap();

    let waiter = {
        let svc = Arc::clone(&svc);
        let run_id = run_id.clone();
        tokio::spawn(async move { svc.wait_for_run(&run_id).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    svc.stop_run(&run_id).await.unwrap();

    let run = waiter.await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Cancelled);
    assert_eq!(svc.stop_calls(), vec![run_id]);
}

#[tokio::test]
async fn event_polling_honors_after_seq() {
    let svc = FakeAgentService::new();
    let events = vec![
        RunEvent { seq: 1, kind: RunEventKind::Log, text: "a".into(), tool: None, ok: None },
        RunEvent { seq: 2, kind: RunEventKind::Log, text: "b".into(), tool: None, ok: None },
        RunEvent { seq: 3, kind: RunEventKind::Log, text: "c".into(), tool: None, ok: None },
    ];
    svc.script("t1", ScriptedRun::success("ok").with_events(events));
    let run_id = svc.execute_task_async(start("t1")).await.unwrap();

    let tail = svc.get_run_events(&run_id, 1).await.unwrap();
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].seq, 2);
}

#[tokio::test]
async fn sweep_sees_live_and_external_tags_with_prefix() {
    let svc = FakeAgentService::new();
    svc.script("t1", ScriptedRun::success("ok").running_for(Duration::from_secs(30)));
    svc.execute_task_async(start("t1")).await.unwrap();
    svc.add_external_tag("drover-stray");
    svc.add_external_tag("other-ignored");

    let tags = svc.list_agent_tags("drover-").await.unwrap();
    assert_eq!(tags, vec!["drover-stray".to_string(), "drover-t1".to_string()]);
}

#[tokio::test]
async fn scripted_stop_failures_and_pgids_surface() {
    let svc = FakeAgentService::new();
    svc.script("t1", ScriptedRun::success("stuck").with_pgid(777).stop_fails());
    let run_id = svc.execute_task_async(start("t1")).await.unwrap();

    assert!(svc.stop_run(&run_id).await.is_err());
    assert_eq!(svc.run_pgid(&run_id).await.unwrap(), Some(777));

    let other = svc.execute_task_async(start("t2")).await.unwrap();
    assert_eq!(svc.run_pgid(&other).await.unwrap(), None);
}

#[tokio::test]
async fn unavailable_service_rejects_starts() {
    let svc = FakeAgentService::new();
    svc.set_unavailable(true);
    assert!(!svc.is_available().await);
    assert!(svc.execute_task_async(start("t1")).await.is_err());
}
