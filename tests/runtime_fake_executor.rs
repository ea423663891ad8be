// tests/runtime_fake_executor.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::sync::{Arc, Mutex};

use assetflow::engine::{
    CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions, SessionSummary,
    TriggerWhileRunningBehaviour,
};
use assetflow_test_utils::{manual_trigger, FakeExecutor};
use tokio::sync::mpsc;

fn exit_when_idle() -> RuntimeOptions {
    RuntimeOptions {
        exit_when_idle: true,
    }
}

async fn trigger(tx: &mpsc::Sender<RuntimeEvent>, task: &str) {
    tx.send(manual_trigger(task)).await.unwrap();
}

#[tokio::test]
async fn failures_do_not_stop_the_loop() {
    init_tracing();
    let (tx, rx) = mpsc::channel(32);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed)).failing("styles");
    let core = CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, 1, exit_when_idle());

    trigger(&tx, "styles").await;
    trigger(&tx, "scripts").await;
    // Arrives while `styles` is still marked running, so it is queued and
    // replayed after the failed run completes.
    trigger(&tx, "styles").await;

    let summary = with_timeout(Runtime::new(core, rx, executor).run())
        .await
        .unwrap();

    assert_eq!(
        *executed.lock().unwrap(),
        vec!["styles".to_string(), "scripts".to_string(), "styles".to_string()]
    );
    assert_eq!(
        summary,
        SessionSummary {
            runs: 3,
            failures: 2,
            coalesced: 1,
        }
    );
}

#[tokio::test]
async fn cancel_mode_replays_only_the_latest_trigger() {
    init_tracing();
    let (tx, rx) = mpsc::channel(32);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));
    let core = CoreRuntime::new(TriggerWhileRunningBehaviour::Cancel, 5, exit_when_idle());

    for _ in 0..4 {
        trigger(&tx, "pages").await;
    }

    let summary = with_timeout(Runtime::new(core, rx, executor).run())
        .await
        .unwrap();

    assert_eq!(*executed.lock().unwrap(), vec!["pages", "pages"]);
    assert_eq!(summary.coalesced, 3);
}

#[tokio::test]
async fn queue_mode_caps_pending_runs() {
    init_tracing();
    let (tx, rx) = mpsc::channel(32);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));
    let core = CoreRuntime::new(TriggerWhileRunningBehaviour::Queue, 2, exit_when_idle());

    for _ in 0..5 {
        trigger(&tx, "images").await;
    }

    let summary = with_timeout(Runtime::new(core, rx, executor).run())
        .await
        .unwrap();

    // One immediate run plus at most two queued replays.
    assert_eq!(executed.lock().unwrap().len(), 3);
    assert_eq!(summary.runs, 3);
    assert_eq!(summary.coalesced, 4);
}

#[tokio::test]
async fn shutdown_request_stops_a_long_lived_loop() {
    init_tracing();
    let (tx, rx) = mpsc::channel(8);
    let executed = Arc::new(Mutex::new(Vec::new()));
    let executor = FakeExecutor::new(tx.clone(), Arc::clone(&executed));
    let core = CoreRuntime::new(
        TriggerWhileRunningBehaviour::Queue,
        1,
        RuntimeOptions::default(),
    );

    tx.send(RuntimeEvent::ShutdownRequested).await.unwrap();

    let summary = with_timeout(Runtime::new(core, rx, executor).run())
        .await
        .unwrap();
    assert!(executed.lock().unwrap().is_empty());
    assert_eq!(summary, SessionSummary::default());
}
