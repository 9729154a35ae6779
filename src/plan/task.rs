// src/plan/task.rs

//! Task: a closure plus the execution context it must run on.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::errors::{Result, SequencerError};
use crate::types::Affinity;

/// The body of a task.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// One-shot callback invoked with the task's id after its work returns.
pub type CompletionNotifier = Box<dyn FnOnce(TaskId) + Send + 'static>;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque task identity, unique for the lifetime of the process.
///
/// Used to correlate an asynchronous completion signal with the task that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// A unit of work tagged with an execution-context affinity.
///
/// A task is immutable once built, except for the completion notifier which
/// the coordinator binds right before dispatching pre, post and chained main
/// tasks. Running a task consumes it.
pub struct Task {
    id: TaskId,
    name: Option<String>,
    affinity: Affinity,
    work: Option<Work>,
    on_complete: Option<CompletionNotifier>,
}

impl Task {
    /// Create a task with `work` already bound.
    pub fn new<F>(affinity: Affinity, work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let mut task = Self::unbound(affinity);
        task.define(work);
        task
    }

    /// Create a task with no work bound yet.
    ///
    /// Running it before calling [`Task::define`] fails with
    /// [`SequencerError::Linkage`].
    pub fn unbound(affinity: Affinity) -> Self {
        Self {
            id: TaskId::next(),
            name: None,
            affinity,
            work: None,
            on_complete: None,
        }
    }

    /// Attach a human-readable name used in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Bind the work closure, replacing any previous one.
    pub fn define<F>(&mut self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.work = Some(Box::new(work));
    }

    /// Attach a one-shot completion callback, replacing any previous one.
    pub fn bind_completion<F>(&mut self, notifier: F)
    where
        F: FnOnce(TaskId) + Send + 'static,
    {
        self.on_complete = Some(Box::new(notifier));
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    pub fn is_defined(&self) -> bool {
        self.work.is_some()
    }

    /// Run the work synchronously on the calling thread, then fire the
    /// completion notifier (if bound).
    ///
    /// If no work is bound this returns [`SequencerError::Linkage`] and the
    /// notifier is dropped without being called. A panic inside the work
    /// unwinds out of this call and the notifier is never invoked either.
    pub fn run(self) -> Result<TaskId> {
        let Task {
            id,
            work,
            on_complete,
            ..
        } = self;

        let work = work.ok_or(SequencerError::Linkage { id })?;

        trace!(task = %id, "running task body");
        work();

        if let Some(notify) = on_complete {
            notify(id);
        }

        Ok(id)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("affinity", &self.affinity)
            .field("defined", &self.work.is_some())
            .field("completion_bound", &self.on_complete.is_some())
            .finish()
    }
}
