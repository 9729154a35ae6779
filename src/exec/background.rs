// src/exec/background.rs

//! Background workers: one new OS thread per job.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;

use thread_priority::{ThreadPriority, set_current_thread_priority};
use tracing::{debug, trace, warn};

use crate::errors::{Result, SequencerError};
use crate::exec::Job;

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);
static PRIORITY_REFUSAL_LOGGED: AtomicBool = AtomicBool::new(false);

/// Spawn a detached worker thread at the highest thread priority the OS
/// grants and run `job` on it.
///
/// The thread is never joined, so it does not keep the process alive.
/// Panics inside `job` are not caught here; they are reported by the
/// process panic hook like on any other thread.
///
/// Returns [`SequencerError::Configuration`] if the OS refuses to spawn a
/// thread.
pub fn spawn_worker(job: Job) -> Result<()> {
    let worker_id = NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed);
    let name = format!("sequencer-worker-{worker_id}");

    trace!(worker = %name, "spawning background worker");

    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            raise_priority();
            job();
            trace!(worker = worker_id, "background worker finished");
        })
        .map_err(|e| {
            SequencerError::Configuration(format!("failed to spawn background worker: {e}"))
        })?;

    debug!(worker = %name, thread = ?handle.thread().id(), "background worker spawned");

    // Detach.
    drop(handle);
    Ok(())
}

/// Best effort: most platforms need extra rights for the top priority, so a
/// refusal is logged (at warn level once per process) and the worker
/// carries on at its default priority.
fn raise_priority() {
    if let Err(err) = set_current_thread_priority(ThreadPriority::Max) {
        if PRIORITY_REFUSAL_LOGGED.swap(true, Ordering::Relaxed) {
            debug!(error = ?err, "could not raise background worker priority");
        } else {
            warn!(error = ?err, "could not raise background worker priority");
        }
    }
}
