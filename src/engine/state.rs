// src/engine/state.rs

//! Phase state owned by the coordinator core.

use std::collections::VecDeque;

use tracing::debug;

use crate::plan::{Plan, PlanParts, Task, TaskId};
use crate::types::{Mode, Phase};

/// Everything the coordinator knows about its run.
///
/// Mutated only from the coordinator's own message loop.
#[derive(Debug)]
pub struct PhaseState {
    pub(crate) phase: Phase,
    pub(crate) mode: Mode,
    pub(crate) started: bool,
    pub(crate) pre_task: Option<Task>,
    /// Main tasks not yet dispatched. In chained mode the front is the
    /// cursor.
    pub(crate) main_tasks: VecDeque<Task>,
    pub(crate) post_task: Option<Task>,
    /// Task whose completion signal the coordinator is waiting for.
    pub(crate) awaiting: Option<TaskId>,
    pub(crate) main_total: usize,
    pub(crate) dispatched: usize,
    pub(crate) completed: usize,
}

impl PhaseState {
    pub fn from_plan(plan: Plan) -> Self {
        let PlanParts {
            main_tasks,
            pre_task,
            post_task,
            mode,
        } = plan.into_parts();

        Self {
            phase: Phase::Idle,
            mode,
            started: false,
            pre_task,
            main_total: main_tasks.len(),
            main_tasks: main_tasks.into(),
            post_task,
            awaiting: None,
            dispatched: 0,
            completed: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Terminated
    }

    pub fn awaiting(&self) -> Option<TaskId> {
        self.awaiting
    }

    /// Position of the chained cursor: how many main tasks have been taken.
    pub fn main_cursor(&self) -> usize {
        self.main_total - self.main_tasks.len()
    }

    pub fn main_remaining(&self) -> usize {
        self.main_tasks.len()
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn has_post_task(&self) -> bool {
        self.post_task.is_some()
    }

    /// Take the next main task in plan order, if any.
    pub(crate) fn take_next_main(&mut self) -> Option<Task> {
        self.main_tasks.pop_front()
    }

    /// Drain every remaining main task, in plan order.
    pub(crate) fn take_all_main(&mut self) -> Vec<Task> {
        self.main_tasks.drain(..).collect()
    }

    /// Record that `task` is about to be dispatched. If `await_completion` is
    /// set, the coordinator will wait for its completion signal.
    pub(crate) fn note_dispatch(&mut self, task: &Task, await_completion: bool) {
        self.dispatched += 1;
        if await_completion {
            self.awaiting = Some(task.id());
        }
    }

    /// Enter the absorbing terminal phase and drop every task still held.
    pub(crate) fn release(&mut self) {
        let held = self.main_tasks.len()
            + usize::from(self.pre_task.is_some())
            + usize::from(self.post_task.is_some());

        self.main_tasks.clear();
        self.pre_task = None;
        self.post_task = None;
        self.awaiting = None;
        self.phase = Phase::Terminated;

        debug!(released = held, "coordinator released task references");
    }
}
