// src/exec/backend.rs

//! Pluggable dispatcher abstraction.
//!
//! The coordinator talks to a `Dispatcher` instead of spawning threads
//! itself. This keeps the phase state machine independent from any concrete
//! UI/event-loop implementation and lets tests swap in a dispatcher that
//! records or holds back jobs.
//!
//! - `ThreadDispatcher` is the default implementation. Privileged jobs go to
//!   a [`PrivilegedHandle`]; background jobs get their own OS thread.

use std::sync::Arc;

use tracing::trace;

use crate::errors::{Result, SequencerError};
use crate::exec::background::spawn_worker;
use crate::exec::privileged::PrivilegedHandle;
use crate::exec::{Job, Priority};

/// The two execution capabilities the coordinator needs from its
/// environment.
///
/// Both methods must return promptly: they schedule work, they never wait
/// for it. Implementations are called from the coordinator loop while jobs
/// they spawned may be running on other threads, so they must be
/// thread-safe.
pub trait Dispatcher: Send + Sync {
    /// Schedule `job` on the single privileged context.
    ///
    /// Returns [`SequencerError::Configuration`] if no privileged context is
    /// available.
    fn run_privileged(&self, job: Job, priority: Priority) -> Result<()>;

    /// Run `job` on a freshly spawned, unpooled worker.
    fn run_background(&self, job: Job) -> Result<()>;
}

impl<D: Dispatcher + ?Sized> Dispatcher for Arc<D> {
    fn run_privileged(&self, job: Job, priority: Priority) -> Result<()> {
        (**self).run_privileged(job, priority)
    }

    fn run_background(&self, job: Job) -> Result<()> {
        (**self).run_background(job)
    }
}

/// Default dispatcher: privileged jobs go to a [`PrivilegedContext`]
/// thread, background jobs each get a new detached thread.
///
/// [`PrivilegedContext`]: crate::exec::PrivilegedContext
#[derive(Debug, Clone, Default)]
pub struct ThreadDispatcher {
    privileged: Option<PrivilegedHandle>,
}

impl ThreadDispatcher {
    pub fn new(privileged: PrivilegedHandle) -> Self {
        Self {
            privileged: Some(privileged),
        }
    }

    /// A dispatcher with no privileged context. Any privileged dispatch
    /// fails with a configuration error.
    pub fn background_only() -> Self {
        Self { privileged: None }
    }

    pub fn has_privileged(&self) -> bool {
        self.privileged.is_some()
    }
}

impl Dispatcher for ThreadDispatcher {
    fn run_privileged(&self, job: Job, priority: Priority) -> Result<()> {
        let handle = self.privileged.as_ref().ok_or_else(|| {
            SequencerError::Configuration(
                "privileged task dispatched but no privileged context is configured".to_string(),
            )
        })?;

        trace!(context = handle.thread_name(), ?priority, "dispatching privileged job");
        handle.submit(job, priority)
    }

    fn run_background(&self, job: Job) -> Result<()> {
        spawn_worker(job)
    }
}
