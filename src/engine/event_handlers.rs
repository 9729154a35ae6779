// src/engine/event_handlers.rs

//! Message handling logic for the coordinator core.
//!
//! Each handler inspects and updates the [`PhaseState`] and returns the
//! commands the async shell must carry out. Handlers never call each other
//! across phases: moving to the next phase always goes through a posted
//! message.

use tracing::{debug, error, info, warn};

use crate::engine::CoordinatorMessage;
use crate::engine::state::PhaseState;
use crate::errors::SequencerError;
use crate::plan::{Task, TaskId};
use crate::types::{Mode, Phase};

/// Command produced by the core, executed by the outer shell.
#[derive(Debug)]
pub enum CoreCommand {
    /// Hand `task` to the dispatcher according to its affinity. When
    /// `notify` is set, its completion is wired back as
    /// [`CoordinatorMessage::TaskCompleted`].
    Dispatch { task: Task, notify: bool },
    /// Put a message at the back of the coordinator's own queue.
    Post(CoordinatorMessage),
    /// Stop the run with a fatal error.
    Abort(SequencerError),
}

/// Decision returned by the core after handling one message.
#[derive(Debug)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the shell should keep draining the queue.
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn idle() -> Self {
        Self::running(Vec::new())
    }

    fn stopped(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: false,
        }
    }
}

/// Handle `Start`.
///
/// With a pre task, dispatch it with its completion wired; otherwise post
/// `EnterMain` straight away. A second `Start` is ignored.
pub fn handle_start(state: &mut PhaseState) -> CoreStep {
    if state.started {
        warn!(phase = %state.phase, "start requested but coordinator already started; ignoring");
        return CoreStep::idle();
    }
    state.started = true;

    match state.pre_task.take() {
        Some(task) => {
            info!(task = %task.id(), "entering pre phase");
            state.phase = Phase::Pre;
            state.note_dispatch(&task, true);
            CoreStep::running(vec![CoreCommand::Dispatch { task, notify: true }])
        }
        None => {
            debug!("no pre task; posting main phase");
            CoreStep::running(vec![CoreCommand::Post(CoordinatorMessage::EnterMain)])
        }
    }
}

/// Handle `EnterMain`: dispatch main tasks per the plan's mode.
pub fn handle_enter_main(state: &mut PhaseState) -> CoreStep {
    let ready = state.started
        && matches!(state.phase, Phase::Idle | Phase::Pre)
        && state.awaiting.is_none();
    if !ready {
        warn!(phase = %state.phase, "main phase message out of order; ignoring");
        return CoreStep::idle();
    }

    info!(mode = ?state.mode, tasks = state.main_tasks.len(), "entering main phase");
    state.phase = Phase::Main;

    let commands = match state.mode {
        Mode::Chained => dispatch_next_chained(state),
        Mode::Fanout => dispatch_fanout(state),
    };
    CoreStep::running(commands)
}

/// Handle `EnterPost`: dispatch the post task with its completion wired.
pub fn handle_enter_post(state: &mut PhaseState) -> CoreStep {
    if state.phase != Phase::Main || state.awaiting.is_some() {
        warn!(phase = %state.phase, "post phase message out of order; ignoring");
        return CoreStep::idle();
    }

    match state.post_task.take() {
        Some(task) => {
            info!(task = %task.id(), "entering post phase");
            state.phase = Phase::Post;
            state.note_dispatch(&task, true);
            CoreStep::running(vec![CoreCommand::Dispatch { task, notify: true }])
        }
        None => CoreStep::running(vec![CoreCommand::Post(CoordinatorMessage::Terminate)]),
    }
}

/// Handle a completion signal from a pre, chained main or post task.
pub fn handle_task_completed(state: &mut PhaseState, id: TaskId) -> CoreStep {
    if state.awaiting != Some(id) {
        warn!(
            task = %id,
            awaiting = ?state.awaiting,
            phase = %state.phase,
            "completion for a task the coordinator is not waiting on; ignoring"
        );
        return CoreStep::idle();
    }

    state.awaiting = None;
    state.completed += 1;
    debug!(task = %id, phase = %state.phase, "task completed");

    match state.phase {
        Phase::Pre => CoreStep::running(vec![CoreCommand::Post(CoordinatorMessage::EnterMain)]),
        Phase::Main => CoreStep::running(dispatch_next_chained(state)),
        Phase::Post => CoreStep::running(vec![CoreCommand::Post(CoordinatorMessage::Terminate)]),
        Phase::Idle | Phase::Terminated => CoreStep::idle(),
    }
}

/// Handle a task that could not run. Aborts the current phase.
pub fn handle_task_failed(state: &mut PhaseState, id: TaskId, err: SequencerError) -> CoreStep {
    error!(task = %id, phase = %state.phase, error = %err, "task failed to run; aborting");
    state.release();
    CoreStep::stopped(vec![CoreCommand::Abort(err)])
}

/// Handle `Terminate`: release everything and stop. Idempotent.
pub fn handle_terminate(state: &mut PhaseState) -> CoreStep {
    if state.is_terminated() {
        debug!("terminate requested but coordinator already terminated");
        return CoreStep::stopped(Vec::new());
    }

    info!(phase = %state.phase, "coordinator terminating");
    state.release();
    CoreStep::stopped(Vec::new())
}

/// Take the next main task in plan order and dispatch it with its completion
/// wired back, or finish the main phase when none are left.
fn dispatch_next_chained(state: &mut PhaseState) -> Vec<CoreCommand> {
    match state.take_next_main() {
        Some(task) => {
            debug!(
                task = %task.id(),
                position = state.main_cursor(),
                remaining = state.main_remaining(),
                "dispatching next chained task"
            );
            state.note_dispatch(&task, true);
            vec![CoreCommand::Dispatch { task, notify: true }]
        }
        None => vec![finish_main(state)],
    }
}

/// Dispatch every main task at once, then finish the main phase without
/// waiting for any of them.
fn dispatch_fanout(state: &mut PhaseState) -> Vec<CoreCommand> {
    let mut commands: Vec<CoreCommand> = state
        .take_all_main()
        .into_iter()
        .map(|task| {
            state.note_dispatch(&task, false);
            CoreCommand::Dispatch {
                task,
                notify: false,
            }
        })
        .collect();

    debug!(dispatched = commands.len(), "fan-out dispatches issued");
    commands.push(finish_main(state));
    commands
}

fn finish_main(state: &PhaseState) -> CoreCommand {
    if state.has_post_task() {
        debug!("main phase finished; posting post phase");
        CoreCommand::Post(CoordinatorMessage::EnterPost)
    } else {
        debug!("main phase finished with no post task; posting terminate");
        CoreCommand::Post(CoordinatorMessage::Terminate)
    }
}
