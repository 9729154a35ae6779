// tests/privileged_context.rs

mod common;
use crate::common::{TestResult, init_tracing};

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use sequencer::exec::{Dispatcher, Priority, PrivilegedContext, ThreadDispatcher};
use thread_priority::{ThreadPriority, get_current_thread_priority, set_current_thread_priority};

fn recorder() -> (
    Arc<Mutex<Vec<&'static str>>>,
    impl Fn(&'static str) -> Box<dyn FnOnce() + Send>,
) {
    let order = Arc::new(Mutex::new(Vec::new()));
    let o = Arc::clone(&order);
    let make = move |label: &'static str| {
        let o = Arc::clone(&o);
        Box::new(move || o.lock().unwrap().push(label)) as Box<dyn FnOnce() + Send>
    };
    (order, make)
}

#[test]
fn urgent_jobs_jump_ahead_of_queued_normal_jobs() -> TestResult {
    init_tracing();

    let context = PrivilegedContext::spawn("ui-priority")?;
    let handle = context.handle();
    let (order, job) = recorder();

    // Park the context so every later job queues up behind this one.
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (parked_tx, parked_rx) = mpsc::channel::<()>();
    handle.post(move || {
        let _ = parked_tx.send(());
        let _ = release_rx.recv_timeout(Duration::from_secs(2));
    })?;
    parked_rx.recv_timeout(Duration::from_secs(2))?;

    handle.submit(job("n1"), Priority::Normal)?;
    handle.submit(job("n2"), Priority::Normal)?;
    handle.submit(job("u1"), Priority::Urgent)?;
    handle.submit(job("u2"), Priority::Urgent)?;

    release_tx.send(())?;
    context.shutdown();

    assert_eq!(*order.lock().unwrap(), vec!["u1", "u2", "n1", "n2"]);
    Ok(())
}

#[test]
fn post_urgent_runs_before_jobs_posted_earlier() -> TestResult {
    init_tracing();

    let context = PrivilegedContext::spawn("ui-post-urgent")?;
    let handle = context.handle();
    let (order, job) = recorder();

    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (parked_tx, parked_rx) = mpsc::channel::<()>();
    handle.post(move || {
        let _ = parked_tx.send(());
        let _ = release_rx.recv_timeout(Duration::from_secs(2));
    })?;
    parked_rx.recv_timeout(Duration::from_secs(2))?;

    handle.post(job("normal"))?;
    handle.post_urgent(job("urgent"))?;

    release_tx.send(())?;
    context.shutdown();

    assert_eq!(*order.lock().unwrap(), vec!["urgent", "normal"]);
    assert!(handle.post_urgent(|| {}).is_err());
    Ok(())
}

#[test]
fn jobs_run_on_the_named_thread_one_at_a_time() -> TestResult {
    init_tracing();

    let context = PrivilegedContext::spawn("ui-named")?;
    let handle = context.handle();
    assert_eq!(handle.thread_name(), "ui-named");

    let seen = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..3 {
        let seen = Arc::clone(&seen);
        handle.post(move || {
            let name = thread::current().name().map(str::to_string);
            seen.lock().unwrap().push(name);
        })?;
    }

    context.shutdown();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|n| n.as_deref() == Some("ui-named")));
    Ok(())
}

#[test]
fn a_panicking_job_does_not_take_the_context_down() -> TestResult {
    init_tracing();

    let context = PrivilegedContext::spawn("ui-panic")?;
    let handle = context.handle();
    let (order, job) = recorder();

    handle.post(|| panic!("job exploded"))?;
    handle.submit(job("after"), Priority::Normal)?;

    let (done_tx, done_rx) = mpsc::channel::<()>();
    handle.post(move || {
        let _ = done_tx.send(());
    })?;
    done_rx.recv_timeout(Duration::from_secs(2))?;

    assert!(!handle.is_closed());
    assert_eq!(*order.lock().unwrap(), vec!["after"]);

    context.shutdown();
    Ok(())
}

#[test]
fn shutdown_runs_queued_jobs_then_closes() -> TestResult {
    init_tracing();

    let context = PrivilegedContext::spawn("ui-drain")?;
    let handle = context.handle();
    let (order, job) = recorder();

    for label in ["a", "b", "c"] {
        handle.submit(job(label), Priority::Normal)?;
    }
    context.shutdown();

    assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    assert!(handle.is_closed());
    assert!(handle.post(|| {}).is_err());
    Ok(())
}

#[test]
fn thread_dispatcher_routes_by_capability() -> TestResult {
    init_tracing();

    let background_only = ThreadDispatcher::background_only();
    assert!(!background_only.has_privileged());
    assert!(background_only.run_privileged(Box::new(|| {}), Priority::Normal).is_err());

    let (tx, rx) = mpsc::channel::<Option<String>>();
    background_only.run_background(Box::new(move || {
        let _ = tx.send(thread::current().name().map(str::to_string));
    }))?;
    let worker = rx.recv_timeout(Duration::from_secs(2))?.unwrap_or_default();
    assert!(worker.starts_with("sequencer-worker-"), "ran on {worker}");

    let context = PrivilegedContext::spawn("ui-routed")?;
    let dispatcher = ThreadDispatcher::new(context.handle());
    assert!(dispatcher.has_privileged());

    let (tx, rx) = mpsc::channel::<Option<String>>();
    dispatcher.run_privileged(
        Box::new(move || {
            let _ = tx.send(thread::current().name().map(str::to_string));
        }),
        Priority::Urgent,
    )?;
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(2))?.as_deref(),
        Some("ui-routed")
    );

    context.shutdown();
    Ok(())
}

#[test]
fn background_workers_run_at_the_highest_priority_granted() -> TestResult {
    init_tracing();

    // What a thread that asks for the top priority ends up with here.
    let granted = thread::spawn(|| {
        let _ = set_current_thread_priority(ThreadPriority::Max);
        get_current_thread_priority()
    })
    .join()
    .expect("reference thread")
    .map_err(|e| format!("{e:?}"))?;

    let (tx, rx) = mpsc::channel();
    ThreadDispatcher::background_only().run_background(Box::new(move || {
        let _ = tx.send(get_current_thread_priority());
    }))?;
    let worker = rx
        .recv_timeout(Duration::from_secs(2))?
        .map_err(|e| format!("{e:?}"))?;

    assert_eq!(worker, granted);
    Ok(())
}
