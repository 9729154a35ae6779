// src/plan/builder.rs

//! Consuming builder that accumulates tasks into a [`Plan`].

use tracing::debug;

use crate::plan::model::Plan;
use crate::plan::task::Task;
use crate::types::{Affinity, Mode};

/// Collects main, pre and post tasks and produces an immutable [`Plan`].
///
/// Main tasks keep their insertion order. Setting a pre or post task twice
/// replaces the earlier one. Tasks are moved in, so the same task can never
/// appear twice in one plan.
#[derive(Debug, Default)]
pub struct PlanBuilder {
    main_tasks: Vec<Task>,
    pre_task: Option<Task>,
    post_task: Option<Task>,
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a main task that must run on the privileged context.
    pub fn add_privileged_task<F>(self, work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.add_task(Affinity::Privileged, work)
    }

    /// Add a main task that runs on its own background worker.
    pub fn add_background_task<F>(self, work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.add_task(Affinity::Background, work)
    }

    pub fn add_task<F>(self, affinity: Affinity, work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.push_task(Task::new(affinity, work))
    }

    /// Set the task run before the main phase.
    pub fn pre_task<F>(self, affinity: Affinity, work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.with_pre_task(Task::new(affinity, work))
    }

    /// Set the task run after the main phase.
    pub fn post_task<F>(self, affinity: Affinity, work: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.with_post_task(Task::new(affinity, work))
    }

    /// Append a prebuilt main task.
    pub fn push_task(mut self, task: Task) -> Self {
        self.main_tasks.push(task);
        self
    }

    /// Use a prebuilt task as the pre task.
    pub fn with_pre_task(mut self, task: Task) -> Self {
        if let Some(old) = self.pre_task.replace(task) {
            debug!(task = %old.id(), "pre task replaced");
        }
        self
    }

    /// Use a prebuilt task as the post task.
    pub fn with_post_task(mut self, task: Task) -> Self {
        if let Some(old) = self.post_task.replace(task) {
            debug!(task = %old.id(), "post task replaced");
        }
        self
    }

    /// Finalize into an immutable plan.
    pub fn build(self, mode: Mode) -> Plan {
        debug!(
            ?mode,
            main_tasks = self.main_tasks.len(),
            has_pre = self.pre_task.is_some(),
            has_post = self.post_task.is_some(),
            "plan built"
        );
        Plan::new(self.main_tasks, self.pre_task, self.post_task, mode)
    }
}
