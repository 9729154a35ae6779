// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::errors::{Result, SequencerError};
use crate::exec::{Dispatcher, Job, Priority};
use crate::plan::{Plan, Task, TaskId};
use crate::types::Affinity;

use super::core::CoreCoordinator;
use super::{CoordinatorMessage, CoordinatorOptions, CoreCommand, RunSummary};

type TerminationCallback = Box<dyn FnOnce(&RunSummary) + Send + 'static>;

/// Drives one [`Plan`] through its phases.
///
/// This is the async shell around [`CoreCoordinator`]: it drains the
/// coordinator's private queue, feeds each message to the core, and carries
/// out the resulting commands through a [`Dispatcher`]. It never waits on a
/// dispatched task; its only suspension point is the queue receive.
pub struct Coordinator<D: Dispatcher> {
    core: CoreCoordinator,
    tx: mpsc::UnboundedSender<CoordinatorMessage>,
    rx: mpsc::UnboundedReceiver<CoordinatorMessage>,
    dispatcher: D,
    options: CoordinatorOptions,
    /// Awaited task and the instant its stall timeout expires.
    stall_deadline: Option<(TaskId, Instant)>,
    on_terminated: Option<TerminationCallback>,
}

/// Host-side control surface of a [`Coordinator`].
///
/// Cheap to clone and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<CoordinatorMessage>,
}

impl<D: Dispatcher> fmt::Debug for Coordinator<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("core", &self.core)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<D: Dispatcher> Coordinator<D> {
    pub fn new(plan: Plan, dispatcher: D, options: CoordinatorOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            core: CoreCoordinator::new(plan),
            tx,
            rx,
            dispatcher,
            options,
            stall_deadline: None,
            on_terminated: None,
        }
    }

    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            tx: self.tx.clone(),
        }
    }

    /// Register a callback fired once the coordinator reaches the terminal
    /// phase, whether normally, through `terminate()`, or on a fatal error.
    pub fn on_terminated<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&RunSummary) + Send + 'static,
    {
        self.on_terminated = Some(Box::new(callback));
        self
    }

    /// Main loop.
    ///
    /// Returns once the coordinator is terminated. Fatal errors
    /// (configuration, linkage, stall) end the run early and are returned
    /// here after every held task has been released.
    pub async fn run(mut self) -> Result<RunSummary> {
        info!(mode = ?self.core.state().mode(), "coordinator loop started");

        let outcome = self.drive().await;
        if let Err(ref err) = outcome {
            error!(phase = %self.core.phase(), error = %err, "coordinator aborted");
            self.core.abort();
        }

        let summary = self.core.summary();
        info!(?summary, "coordinator terminated");

        if let Some(callback) = self.on_terminated.take() {
            callback(&summary);
        }

        outcome.map(|()| summary)
    }

    /// Run the loop on the current Tokio runtime.
    pub fn spawn(self) -> JoinHandle<Result<RunSummary>>
    where
        D: 'static,
    {
        tokio::spawn(self.run())
    }

    async fn drive(&mut self) -> Result<()> {
        loop {
            let message = self.next_message().await?;
            debug!(?message, phase = %self.core.phase(), "coordinator received message");

            let step = self.core.step(message);
            for command in step.commands {
                self.execute_command(command)?;
            }

            if !step.keep_running {
                return Ok(());
            }
        }
    }

    /// Wait for the next message, bounded by the stall timeout while a
    /// completion signal is outstanding.
    async fn next_message(&mut self) -> Result<CoordinatorMessage> {
        let received = match (self.options.stall_timeout, self.core.awaiting()) {
            (Some(limit), Some(task)) => {
                // The deadline is fixed when a task starts being awaited, so
                // ignored messages do not push it back.
                let deadline = match self.stall_deadline {
                    Some((awaited, deadline)) if awaited == task => deadline,
                    _ => {
                        let deadline = Instant::now() + limit;
                        self.stall_deadline = Some((task, deadline));
                        deadline
                    }
                };
                match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                    Ok(message) => message,
                    Err(_elapsed) => {
                        error!(task = %task, ?limit, "no completion signal within stall timeout");
                        return Err(SequencerError::Stalled {
                            phase: self.core.phase(),
                            waited: limit,
                        });
                    }
                }
            }
            _ => self.rx.recv().await,
        };

        // The coordinator holds a sender itself, so the queue cannot close
        // while this loop is alive.
        received.ok_or(SequencerError::Terminated)
    }

    fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::Dispatch { task, notify } => self.dispatch(task, notify),
            CoreCommand::Post(message) => self
                .tx
                .send(message)
                .map_err(|_| SequencerError::Terminated),
            CoreCommand::Abort(err) => Err(err),
        }
    }

    fn dispatch(&self, mut task: Task, notify: bool) -> Result<()> {
        let id = task.id();
        let affinity = task.affinity();

        if notify {
            let tx = self.tx.clone();
            task.bind_completion(move |id| {
                if tx.send(CoordinatorMessage::TaskCompleted { id }).is_err() {
                    debug!(task = %id, "coordinator gone; dropping completion signal");
                }
            });
        }

        let job = self.wrap(task);
        debug!(task = %id, ?affinity, notify, "dispatching task");

        match affinity {
            Affinity::Privileged => self.dispatcher.run_privileged(job, Priority::Urgent),
            Affinity::Background => self.dispatcher.run_background(job),
        }
    }

    /// Wrap a task so that a failure to run it at all is reported back to
    /// the coordinator. If the coordinator has already exited, the error is
    /// raised as a panic on the executing thread so that context's failure
    /// handling sees it.
    fn wrap(&self, task: Task) -> Job {
        let tx = self.tx.clone();
        Box::new(move || {
            let id = task.id();
            if let Err(error) = task.run() {
                error!(task = %id, error = %error, "task could not run");
                if let Err(mpsc::error::SendError(CoordinatorMessage::TaskFailed {
                    error, ..
                })) = tx.send(CoordinatorMessage::TaskFailed { id, error })
                {
                    panic!("{error}");
                }
            }
        })
    }
}

impl CoordinatorHandle {
    /// Ask the coordinator to begin processing its plan.
    ///
    /// Ignored if it has already started. Fails with
    /// [`SequencerError::Terminated`] once the coordinator loop has exited.
    pub fn start(&self) -> Result<()> {
        self.tx
            .send(CoordinatorMessage::Start)
            .map_err(|_| SequencerError::Terminated)
    }

    /// Ask the coordinator to stop. Idempotent.
    ///
    /// In-flight task bodies are not interrupted; their completion signals
    /// are discarded.
    pub fn terminate(&self) {
        if self.tx.send(CoordinatorMessage::Terminate).is_err() {
            debug!("terminate requested but coordinator already exited");
        }
    }

    /// Whether the coordinator loop has exited.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
