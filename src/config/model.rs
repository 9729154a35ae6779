// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::plan::{PlanBuilder, Task, Work};
use crate::types::{Affinity, Mode};

/// Manifest as read from a TOML file, before validation.
///
/// ```toml
/// [sequence]
/// mode = "chained"
/// stall_timeout = "30s"
///
/// [pre]
/// cmd = "echo prepare"
/// affinity = "privileged"
///
/// [[task]]
/// name = "compile"
/// cmd = "echo compile"
///
/// [post]
/// cmd = "echo done"
/// ```
///
/// Every section is optional, but validation requires at least one task.
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    #[serde(default)]
    pub sequence: SequenceSection,

    /// Task run before the main phase, from `[pre]`.
    #[serde(default)]
    pub pre: Option<TaskEntry>,

    /// Task run after the main phase, from `[post]`.
    #[serde(default)]
    pub post: Option<TaskEntry>,

    /// Main tasks from `[[task]]`, in file order.
    #[serde(default)]
    pub task: Vec<TaskEntry>,
}

/// `[sequence]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SequenceSection {
    /// `"chained"` (default) or `"fanout"`; `"coherence"` and `"oneway"`
    /// are accepted as aliases.
    #[serde(default)]
    pub mode: Mode,

    /// Optional duration string (e.g. `"30s"`) after which a run waiting on
    /// a task completion is aborted.
    #[serde(default)]
    pub stall_timeout: Option<String>,

    /// Name of the privileged context thread.
    #[serde(default = "default_privileged_thread_name")]
    pub privileged_thread_name: String,
}

fn default_privileged_thread_name() -> String {
    "privileged".to_string()
}

impl Default for SequenceSection {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            stall_timeout: None,
            privileged_thread_name: default_privileged_thread_name(),
        }
    }
}

/// One task entry (`[pre]`, `[post]` or `[[task]]`).
#[derive(Debug, Clone, Deserialize)]
pub struct TaskEntry {
    /// Name used in logs. Defaults to `pre`, `post` or `task-<n>`.
    #[serde(default)]
    pub name: Option<String>,

    /// Shell command to run.
    pub cmd: String,

    /// `"background"` (default) or `"privileged"`.
    #[serde(default)]
    pub affinity: Affinity,
}

/// A validated manifest.
///
/// Only obtainable through `TryFrom<RawManifest>` (see `validate.rs`), so
/// every task has a name and a non-empty command.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub sequence: SequenceSection,
    pub pre: Option<NamedEntry>,
    pub post: Option<NamedEntry>,
    pub tasks: Vec<NamedEntry>,
    stall_timeout: Option<Duration>,
}

/// A task entry with its resolved name.
#[derive(Debug, Clone)]
pub struct NamedEntry {
    pub name: String,
    pub cmd: String,
    pub affinity: Affinity,
}

impl Manifest {
    pub(crate) fn new_unchecked(
        sequence: SequenceSection,
        pre: Option<NamedEntry>,
        post: Option<NamedEntry>,
        tasks: Vec<NamedEntry>,
        stall_timeout: Option<Duration>,
    ) -> Self {
        Self {
            sequence,
            pre,
            post,
            tasks,
            stall_timeout,
        }
    }

    pub fn mode(&self) -> Mode {
        self.sequence.mode
    }

    pub fn stall_timeout(&self) -> Option<Duration> {
        self.stall_timeout
    }

    pub fn privileged_thread_name(&self) -> &str {
        &self.sequence.privileged_thread_name
    }

    /// Whether any entry needs the privileged context.
    pub fn needs_privileged(&self) -> bool {
        self.entries().any(|e| e.affinity == Affinity::Privileged)
    }

    /// All entries in phase order (pre, main..., post).
    pub fn entries(&self) -> impl Iterator<Item = &NamedEntry> {
        self.pre
            .iter()
            .chain(self.tasks.iter())
            .chain(self.post.iter())
    }

    /// Feed every entry into a [`PlanBuilder`], using `make_work` to turn
    /// an entry into the task's work.
    pub fn to_builder<F>(&self, mut make_work: F) -> PlanBuilder
    where
        F: FnMut(&NamedEntry) -> Work,
    {
        let mut to_task = |entry: &NamedEntry| {
            let mut task = Task::unbound(entry.affinity).with_name(entry.name.clone());
            task.define(make_work(entry));
            task
        };

        let mut builder = PlanBuilder::new();
        if let Some(ref pre) = self.pre {
            builder = builder.with_pre_task(to_task(pre));
        }
        for entry in &self.tasks {
            builder = builder.push_task(to_task(entry));
        }
        if let Some(ref post) = self.post {
            builder = builder.with_post_task(to_task(post));
        }
        builder
    }
}
