// src/engine/core.rs

//! Pure coordinator state machine.
//!
//! `CoreCoordinator` consumes [`CoordinatorMessage`]s and produces:
//! - an updated [`PhaseState`]
//! - a list of commands describing what the shell should do next
//!
//! It owns no channels, spawns nothing and never blocks, so it can be
//! stepped by hand in tests without a runtime, threads or a dispatcher.

use crate::engine::event_handlers::{
    CoreStep, handle_enter_main, handle_enter_post, handle_start, handle_task_completed,
    handle_task_failed, handle_terminate,
};
use crate::engine::state::PhaseState;
use crate::engine::{CoordinatorMessage, RunSummary};
use crate::plan::{Plan, TaskId};
use crate::types::Phase;

#[derive(Debug)]
pub struct CoreCoordinator {
    state: PhaseState,
    aborted: bool,
}

impl CoreCoordinator {
    pub fn new(plan: Plan) -> Self {
        Self {
            state: PhaseState::from_plan(plan),
            aborted: false,
        }
    }

    pub fn state(&self) -> &PhaseState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminated()
    }

    /// Task whose completion the core is currently waiting on, if any.
    pub fn awaiting(&self) -> Option<TaskId> {
        self.state.awaiting()
    }

    /// Handle one message and return the commands for the shell.
    ///
    /// Once terminated, every message is ignored.
    pub fn step(&mut self, message: CoordinatorMessage) -> CoreStep {
        if self.state.is_terminated() {
            return handle_terminate(&mut self.state);
        }

        match message {
            CoordinatorMessage::Start => handle_start(&mut self.state),
            CoordinatorMessage::EnterMain => handle_enter_main(&mut self.state),
            CoordinatorMessage::EnterPost => handle_enter_post(&mut self.state),
            CoordinatorMessage::TaskCompleted { id } => {
                handle_task_completed(&mut self.state, id)
            }
            CoordinatorMessage::TaskFailed { id, error } => {
                self.aborted = true;
                handle_task_failed(&mut self.state, id, error)
            }
            CoordinatorMessage::Terminate => handle_terminate(&mut self.state),
        }
    }

    /// Force the core into the terminal phase after a fatal error raised
    /// outside of [`step`](Self::step) (e.g. a dispatch that failed).
    pub fn abort(&mut self) {
        self.aborted = true;
        if !self.state.is_terminated() {
            self.state.release();
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            dispatched: self.state.dispatched(),
            completed: self.state.completed(),
            aborted: self.aborted,
        }
    }
}
