// src/plan/model.rs

use std::fmt;

use crate::plan::task::{Task, TaskId};
use crate::types::Mode;

/// Finalized, immutable description of a sequencing run.
///
/// Produced by [`PlanBuilder::build`](crate::plan::PlanBuilder::build) and
/// moved into exactly one coordinator.
pub struct Plan {
    main_tasks: Vec<Task>,
    pre_task: Option<Task>,
    post_task: Option<Task>,
    mode: Mode,
}

/// Owned pieces of a plan, handed to the coordinator core.
pub struct PlanParts {
    pub main_tasks: Vec<Task>,
    pub pre_task: Option<Task>,
    pub post_task: Option<Task>,
    pub mode: Mode,
}

impl Plan {
    pub(crate) fn new(
        main_tasks: Vec<Task>,
        pre_task: Option<Task>,
        post_task: Option<Task>,
        mode: Mode,
    ) -> Self {
        Self {
            main_tasks,
            pre_task,
            post_task,
            mode,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn main_tasks(&self) -> &[Task] {
        &self.main_tasks
    }

    pub fn pre_task(&self) -> Option<&Task> {
        self.pre_task.as_ref()
    }

    pub fn post_task(&self) -> Option<&Task> {
        self.post_task.as_ref()
    }

    /// Ids of every task in the plan, in phase order (pre, main..., post).
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.pre_task
            .iter()
            .chain(self.main_tasks.iter())
            .chain(self.post_task.iter())
            .map(Task::id)
            .collect()
    }

    /// Total number of tasks across all phases.
    pub fn len(&self) -> usize {
        self.main_tasks.len()
            + usize::from(self.pre_task.is_some())
            + usize::from(self.post_task.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_parts(self) -> PlanParts {
        PlanParts {
            main_tasks: self.main_tasks,
            pre_task: self.pre_task,
            post_task: self.post_task,
            mode: self.mode,
        }
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("mode", &self.mode)
            .field("pre_task", &self.pre_task)
            .field("main_tasks", &self.main_tasks)
            .field("post_task", &self.post_task)
            .finish()
    }
}
