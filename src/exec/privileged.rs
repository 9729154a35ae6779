// src/exec/privileged.rs

//! The privileged execution context.
//!
//! A single dedicated thread that runs at most one job at a time. It drains
//! two queues with a biased `select!`: every queued urgent job runs before
//! any queued normal job, and within a queue jobs run in submission order.
//!
//! The thread drives a current-thread Tokio runtime only to wait on both
//! queues and the shutdown signal; the jobs themselves are synchronous.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::errors::{Result, SequencerError};
use crate::exec::{Job, Priority};

/// Owner of the privileged thread.
///
/// Dropping it without calling [`shutdown`](Self::shutdown) also stops the
/// thread once its queues drain, but does not wait for it.
pub struct PrivilegedContext {
    handle: PrivilegedHandle,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

/// Cheap, cloneable submission handle for a [`PrivilegedContext`].
#[derive(Clone)]
pub struct PrivilegedHandle {
    urgent: mpsc::UnboundedSender<Job>,
    normal: mpsc::UnboundedSender<Job>,
    thread_name: Arc<str>,
}

impl PrivilegedContext {
    /// Start the privileged thread under the given name.
    pub fn spawn(name: impl Into<String>) -> Result<Self> {
        let name: String = name.into();
        let (urgent_tx, urgent_rx) = mpsc::unbounded_channel::<Job>();
        let (normal_tx, normal_rx) = mpsc::unbounded_channel::<Job>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let thread_name = name.clone();
        let thread = thread::Builder::new().name(name.clone()).spawn(move || {
            info!(context = %thread_name, "privileged context started");
            runtime.block_on(drain_queues(urgent_rx, normal_rx, shutdown_rx));
            info!(context = %thread_name, "privileged context finished");
        })?;

        Ok(Self {
            handle: PrivilegedHandle {
                urgent: urgent_tx,
                normal: normal_tx,
                thread_name: Arc::from(name),
            },
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> PrivilegedHandle {
        self.handle.clone()
    }

    /// Stop accepting jobs, run whatever is still queued, and wait for the
    /// thread to exit.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(
                    context = self.handle.thread_name(),
                    "privileged thread exited abnormally"
                );
            }
        }
    }
}

impl fmt::Debug for PrivilegedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivilegedContext")
            .field("handle", &self.handle)
            .field("running", &self.thread.is_some())
            .finish()
    }
}

impl PrivilegedHandle {
    /// Queue `job` behind everything already queued.
    pub fn post<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(job), Priority::Normal)
    }

    /// Queue `job` ahead of all queued normal-priority jobs.
    pub fn post_urgent<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(job), Priority::Urgent)
    }

    pub fn submit(&self, job: Job, priority: Priority) -> Result<()> {
        let queue = match priority {
            Priority::Urgent => &self.urgent,
            Priority::Normal => &self.normal,
        };

        queue.send(job).map_err(|_| {
            SequencerError::Configuration(format!(
                "privileged context '{}' is no longer running",
                self.thread_name
            ))
        })
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Whether the privileged thread has stopped accepting jobs.
    pub fn is_closed(&self) -> bool {
        self.normal.is_closed()
    }
}

impl fmt::Debug for PrivilegedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivilegedHandle")
            .field("thread_name", &self.thread_name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn drain_queues(
    mut urgent: mpsc::UnboundedReceiver<Job>,
    mut normal: mpsc::UnboundedReceiver<Job>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;

            Some(job) = urgent.recv() => run_job(job),
            Some(job) = normal.recv() => run_job(job),
            _ = &mut shutdown => break,
        }
    }

    debug!("privileged context shutting down; draining queued jobs");

    urgent.close();
    normal.close();

    while let Some(job) = urgent.recv().await {
        run_job(job);
    }
    while let Some(job) = normal.recv().await {
        run_job(job);
    }
}

/// Run one job. A panic is reported by the panic hook first; here it is
/// logged and the context keeps serving later jobs.
fn run_job(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        error!(
            panic = %panic_message(payload.as_ref()),
            "job panicked on the privileged context"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
