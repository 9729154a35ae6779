// tests/terminate_behaviour.rs

mod common;
use crate::common::{TestResult, init_tracing, wait_until, with_timeout};

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sequencer::engine::{Coordinator, CoordinatorOptions};
use sequencer::errors::SequencerError;
use sequencer::plan::PlanBuilder;
use sequencer::types::{Affinity, Mode};
use sequencer_test_utils::builders::RunLog;
use sequencer_test_utils::fake_dispatcher::ManualDispatcher;

#[tokio::test]
async fn terminate_before_start_releases_every_task() -> TestResult {
    init_tracing();

    let captured = Arc::new(());
    let capture = |c: &Arc<()>| {
        let c = Arc::clone(c);
        move || drop(c)
    };

    let plan = PlanBuilder::new()
        .pre_task(Affinity::Background, capture(&captured))
        .add_background_task(capture(&captured))
        .add_privileged_task(capture(&captured))
        .post_task(Affinity::Privileged, capture(&captured))
        .build(Mode::Chained);
    assert_eq!(Arc::strong_count(&captured), 5);

    let dispatcher = ManualDispatcher::new();
    let coordinator = Coordinator::new(plan, dispatcher.clone(), CoordinatorOptions::default());
    let handle = coordinator.handle();
    handle.terminate();

    let summary = with_timeout(coordinator.run()).await?;
    assert_eq!(summary.dispatched, 0);
    assert!(!summary.aborted);
    assert_eq!(dispatcher.dispatch_count(), 0);
    assert_eq!(Arc::strong_count(&captured), 1);

    // Start after termination is rejected, not silently queued.
    assert!(matches!(handle.start(), Err(SequencerError::Terminated)));

    Ok(())
}

#[tokio::test]
async fn terminate_mid_chain_stops_further_dispatches() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let plan = PlanBuilder::new()
        .add_background_task(log.work("B"))
        .add_background_task(log.work("C"))
        .post_task(Affinity::Background, log.work("D"))
        .build(Mode::Chained);

    let dispatcher = ManualDispatcher::new();
    let coordinator = Coordinator::new(plan, dispatcher.clone(), CoordinatorOptions::default());
    let handle = coordinator.handle();
    handle.start()?;
    let run = coordinator.spawn();

    let d = dispatcher.clone();
    with_timeout(wait_until(move || d.pending() == 1)).await;

    // B is in flight; terminate lands in the queue before its completion.
    handle.terminate();
    assert!(dispatcher.run_next());

    let summary = with_timeout(run).await??;
    assert_eq!(summary.dispatched, 1);
    assert_eq!(summary.completed, 0);
    assert_eq!(dispatcher.dispatch_count(), 1);
    // The in-flight body ran to the end; nothing after it was dispatched.
    assert_eq!(log.finished(), vec!["B"]);

    Ok(())
}

#[tokio::test]
async fn terminate_is_idempotent_and_callback_fires_once() -> TestResult {
    init_tracing();

    let fired = Arc::new(AtomicUsize::new(0));
    let plan = PlanBuilder::new()
        .add_background_task(|| {})
        .build(Mode::Fanout);

    let coordinator = Coordinator::new(plan, ManualDispatcher::new(), CoordinatorOptions::default())
        .on_terminated({
            let fired = Arc::clone(&fired);
            move |summary| {
                assert!(!summary.aborted);
                fired.fetch_add(1, Ordering::SeqCst);
            }
        });
    let handle = coordinator.handle();

    handle.terminate();
    handle.terminate();
    with_timeout(coordinator.run()).await?;

    // After the loop has exited, terminate is still harmless.
    handle.terminate();
    assert!(handle.is_closed());
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn terminate_during_post_phase_discards_the_completion() -> TestResult {
    init_tracing();

    let log = RunLog::new();
    let plan = PlanBuilder::new()
        .add_background_task(log.work("B"))
        .post_task(Affinity::Background, log.work("D"))
        .build(Mode::Fanout);

    let dispatcher = ManualDispatcher::new();
    let coordinator = Coordinator::new(plan, dispatcher.clone(), CoordinatorOptions::default());
    let handle = coordinator.handle();
    handle.start()?;
    let run = coordinator.spawn();

    let d = dispatcher.clone();
    with_timeout(wait_until(move || d.pending() == 2)).await;
    handle.terminate();

    let summary = with_timeout(run).await??;
    assert_eq!(summary.dispatched, 2);
    assert_eq!(summary.completed, 0);

    // Running the held bodies afterwards is fine; their signals go nowhere.
    while dispatcher.run_next() {}
    assert_eq!(log.finished(), vec!["B", "D"]);

    Ok(())
}
