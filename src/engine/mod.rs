// src/engine/mod.rs

//! Coordination engine.
//!
//! The coordinator walks a [`Plan`](crate::plan::Plan) through its phases
//! (pre, main, post) in response to messages on its own private queue:
//! - `Start` / `Terminate` from the host, via a [`CoordinatorHandle`]
//! - phase-transition messages the coordinator posts to itself
//! - completion and failure signals sent back by dispatched tasks
//!
//! The pure state machine lives in [`core`]; the async shell that drains
//! the queue and talks to the dispatcher is in [`runtime`].

use std::time::Duration;

use crate::errors::SequencerError;
use crate::plan::TaskId;

/// Messages flowing into the coordinator's queue.
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// Begin processing the plan (host request).
    Start,
    /// Enter the main phase.
    EnterMain,
    /// Enter the post phase.
    EnterPost,
    /// A task with a bound completion notifier finished its work.
    TaskCompleted { id: TaskId },
    /// A dispatched task could not run at all.
    TaskFailed { id: TaskId, error: SequencerError },
    /// Stop, release every task and stop honouring messages.
    Terminate,
}

/// Options for the coordinator shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinatorOptions {
    /// Abort the run with [`SequencerError::Stalled`] if the coordinator
    /// waits this long for a completion signal.
    ///
    /// `None` (the default) waits forever, so a task whose body panics
    /// leaves a chained run stalled until the host terminates it.
    pub stall_timeout: Option<Duration>,
}

/// What a finished run looked like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Tasks handed to the dispatcher.
    pub dispatched: usize,
    /// Completion signals honoured.
    pub completed: usize,
    /// Whether the run ended on a fatal error rather than normally or by
    /// `terminate()`.
    pub aborted: bool,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;
pub mod state;

pub use core::CoreCoordinator;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::{Coordinator, CoordinatorHandle};
pub use state::PhaseState;
