use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use sequencer::errors::{Result, SequencerError};
use sequencer::exec::{Dispatcher, Job, Priority, ThreadDispatcher};

/// Where a job was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Privileged(Priority),
    Background,
}

/// A dispatcher that holds jobs until the test runs them.
///
/// - records every dispatch in order
/// - runs nothing on its own; `run_next` executes the oldest held job on
///   the calling thread
///
/// This makes "what has been dispatched so far" fully deterministic.
#[derive(Clone, Default)]
pub struct ManualDispatcher {
    held: Arc<Mutex<VecDeque<(Target, Job)>>>,
    dispatched: Arc<Mutex<Vec<Target>>>,
    without_privileged: bool,
}

impl ManualDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher that rejects privileged jobs like a host without a
    /// privileged context would.
    pub fn without_privileged() -> Self {
        Self {
            without_privileged: true,
            ..Self::default()
        }
    }

    /// Number of dispatched jobs not yet run.
    pub fn pending(&self) -> usize {
        self.held.lock().unwrap().len()
    }

    /// Every dispatch so far, in order.
    pub fn dispatched(&self) -> Vec<Target> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatched.lock().unwrap().len()
    }

    /// Run the oldest held job on the current thread.
    ///
    /// Returns `false` if nothing was held.
    pub fn run_next(&self) -> bool {
        let next = self.held.lock().unwrap().pop_front();
        match next {
            Some((_, job)) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Drop the oldest held job without running it.
    pub fn discard_next(&self) -> bool {
        self.held.lock().unwrap().pop_front().is_some()
    }

    fn hold(&self, target: Target, job: Job) {
        self.dispatched.lock().unwrap().push(target);
        self.held.lock().unwrap().push_back((target, job));
    }
}

impl Dispatcher for ManualDispatcher {
    fn run_privileged(&self, job: Job, priority: Priority) -> Result<()> {
        if self.without_privileged {
            return Err(SequencerError::Configuration(
                "no privileged context in this test".to_string(),
            ));
        }
        self.hold(Target::Privileged(priority), job);
        Ok(())
    }

    fn run_background(&self, job: Job) -> Result<()> {
        self.hold(Target::Background, job);
        Ok(())
    }
}

/// Wraps a real [`ThreadDispatcher`] and records where each job went.
#[derive(Clone)]
pub struct RecordingDispatcher {
    inner: ThreadDispatcher,
    dispatched: Arc<Mutex<Vec<Target>>>,
}

impl RecordingDispatcher {
    pub fn new(inner: ThreadDispatcher) -> Self {
        Self {
            inner,
            dispatched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn dispatched(&self) -> Vec<Target> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatched.lock().unwrap().len()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn run_privileged(&self, job: Job, priority: Priority) -> Result<()> {
        self.dispatched
            .lock()
            .unwrap()
            .push(Target::Privileged(priority));
        self.inner.run_privileged(job, priority)
    }

    fn run_background(&self, job: Job) -> Result<()> {
        self.dispatched.lock().unwrap().push(Target::Background);
        self.inner.run_background(job)
    }
}
