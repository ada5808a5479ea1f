//! Process table, wait and signal behavior observed through the public
//! kernel surface.

mod common;

use ck_core::process::SpawnSpec;
use ck_core::task::OneShot;
use ck_protocol::{ProcessStatus, Signal};
use common::TestRig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn one_shot_spec(name: &str, code: i32) -> SpawnSpec {
    SpawnSpec::new(name)
        .with_logic(Box::new(move |_, _| Box::new(OneShot::new(Box::pin(async move { Ok(code) })))))
}

#[tokio::test(start_paused = true)]
async fn lifecycle_walks_created_queued_running_done() {
    let rig = TestRig::boot();
    let table = rig.kernel.processes();

    let snap = table.spawn(one_shot_spec("walker", 0));
    assert_eq!(snap.status, ProcessStatus::Created);
    assert_eq!(snap.exit_code, None);

    rig.kernel.scheduler().enqueue(snap.pid);
    assert_eq!(table.get(snap.pid).unwrap().status, ProcessStatus::Queued);

    let outcome = table.wait_for_exit(snap.pid).await.unwrap();
    assert_eq!(outcome.exit_code, 0);

    let done = table.get(snap.pid).unwrap();
    assert_eq!(done.status, ProcessStatus::Done);
    assert_eq!(done.exit_code, Some(0));
    assert!(done.end_time.is_some());

    // terminal states never transition again
    assert!(!table.kill(snap.pid, Signal::Kill));
    table.exit(snap.pid, 42);
    assert_eq!(table.get(snap.pid).unwrap().exit_code, Some(0));
    rig.halt().await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_waiters_see_identical_outcomes() {
    let rig = TestRig::boot();
    let table = rig.kernel.processes();
    let snap = table.spawn(one_shot_spec("watched", 7));

    let waits = (0..4).map(|_| table.wait_for_exit(snap.pid));
    let race = futures::future::join_all(waits);

    rig.kernel.scheduler().enqueue(snap.pid);
    let outcomes = race.await;
    for outcome in outcomes {
        let outcome = outcome.unwrap();
        assert_eq!(outcome.pid, snap.pid);
        assert_eq!(outcome.exit_code, 7);
    }

    // late waiters resolve immediately
    let late = table.wait_for_exit(snap.pid).await.unwrap();
    assert_eq!(late.exit_code, 7);
    rig.halt().await;
}

#[tokio::test]
async fn waiting_on_an_unknown_pid_is_not_found() {
    let rig = TestRig::boot();
    let err = rig.kernel.processes().wait_for_exit(404).await.unwrap_err();
    assert_eq!(err.kind(), ck_core::errors::ErrorKind::NotFound);
    rig.halt().await;
}

#[tokio::test(start_paused = true)]
async fn double_kill_is_idempotent() {
    let mut rig = TestRig::boot();
    rig.run("sleep 60 &").await;
    let table = rig.kernel.processes();

    assert!(table.kill(1, Signal::Kill));
    assert!(!table.kill(1, Signal::Kill));

    let after = table.get(1).unwrap();
    assert_eq!(after.status, ProcessStatus::Killed);
    assert_eq!(after.exit_code, Some(137));
    rig.halt().await;
}

#[tokio::test(start_paused = true)]
async fn a_registered_handler_intercepts_sigterm() {
    let mut rig = TestRig::boot();
    rig.run("sleep 60 &").await;
    let table = rig.kernel.processes();

    let caught = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&caught);
    assert!(table.register_signal_handler(
        1,
        Signal::Term,
        Arc::new(move |_| flag.store(true, Ordering::SeqCst)),
    ));

    assert!(table.send_signal(1, Signal::Term));
    assert!(caught.load(Ordering::SeqCst));
    assert!(!table.get(1).unwrap().status.is_terminal());

    // removing the handler restores the default action
    assert!(table.unregister_signal_handler(1, Signal::Term));
    assert!(table.send_signal(1, Signal::Term));
    let after = table.get(1).unwrap();
    assert_eq!(after.status, ProcessStatus::Killed);
    assert_eq!(after.exit_code, Some(128 + 15));
    rig.halt().await;
}

#[tokio::test(start_paused = true)]
async fn sigint_lets_a_cooperative_process_exit_on_its_own() {
    let mut rig = TestRig::boot();
    rig.run("sleep 60 &").await;
    let table = rig.kernel.processes();

    // let the sleeper take at least one slice first
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(table.send_signal(1, Signal::Int));

    let outcome = table.wait_for_exit(1).await.unwrap();
    // sleep polls its cancellation flag and leaves voluntarily
    assert_eq!(outcome.exit_code, 130);
    assert_eq!(table.get(1).unwrap().status, ProcessStatus::Done);
    rig.halt().await;
}

#[tokio::test]
async fn kill_syscall_answers_with_a_flag() {
    let rig = TestRig::boot();
    let table = rig.kernel.processes();
    let snap = table.spawn(one_shot_spec("target", 0));

    let killed = rig
        .kernel
        .syscall(ck_core::syscall::SyscallParams::ProcKill { pid: snap.pid })
        .await
        .unwrap()
        .into_flag()
        .unwrap();
    assert!(killed);

    let again = rig
        .kernel
        .syscall(ck_core::syscall::SyscallParams::ProcKill { pid: snap.pid })
        .await
        .unwrap()
        .into_flag()
        .unwrap();
    assert!(!again);
    rig.halt().await;
}

#[tokio::test(start_paused = true)]
async fn removing_a_record_is_the_only_reclamation() {
    let mut rig = TestRig::boot();
    rig.run("echo gone").await;
    let table = rig.kernel.processes();

    // the finished process stays listed until removed
    assert_eq!(table.list().len(), 1);
    assert!(table.remove(1));
    assert!(table.list().is_empty());
    assert!(!table.remove(1));
    rig.halt().await;
}
