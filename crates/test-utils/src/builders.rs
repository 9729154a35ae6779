#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use sequencer::config::{Manifest, RawManifest, SequenceSection, TaskEntry};
use sequencer::types::{Affinity, Mode};

/// What a logged task observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Started(String),
    Finished(String),
}

/// Shared log that task bodies write into.
///
/// Tracks start/finish order, the thread each body ran on, and the highest
/// number of logged task bodies that were running at the same time.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    events: Arc<Mutex<Vec<Mark>>>,
    threads: Arc<Mutex<Vec<(String, Option<String>)>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Work that records its start, sleeps briefly, and records its finish.
    pub fn work(&self, label: &str) -> impl FnOnce() + Send + 'static {
        self.work_with(label, || thread::sleep(Duration::from_millis(5)))
    }

    /// Work that records its start, runs `body`, and records its finish.
    ///
    /// If `body` panics, no finish is recorded.
    pub fn work_with<F>(&self, label: &str, body: F) -> impl FnOnce() + Send + 'static
    where
        F: FnOnce() + Send + 'static,
    {
        let log = self.clone();
        let label = label.to_string();
        move || {
            log.enter(&label);
            body();
            log.exit(&label);
        }
    }

    pub fn events(&self) -> Vec<Mark> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|p| match p {
                Mark::Started(l) => Some(l),
                Mark::Finished(_) => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|p| match p {
                Mark::Finished(l) => Some(l),
                Mark::Started(_) => None,
            })
            .collect()
    }

    pub fn position(&self, mark: &Mark) -> Option<usize> {
        self.events().iter().position(|p| p == mark)
    }

    /// Name of the thread the body labelled `label` ran on.
    pub fn thread_of(&self, label: &str) -> Option<String> {
        self.threads
            .lock()
            .unwrap()
            .iter()
            .find(|(l, _)| l == label)
            .and_then(|(_, name)| name.clone())
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn enter(&self, label: &str) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.threads.lock().unwrap().push((
            label.to_string(),
            thread::current().name().map(str::to_string),
        ));
        self.events
            .lock()
            .unwrap()
            .push(Mark::Started(label.to_string()));
    }

    fn exit(&self, label: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Mark::Finished(label.to_string()));
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Builder for `Manifest` to simplify test setup.
pub struct ManifestBuilder {
    manifest: RawManifest,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self {
            manifest: RawManifest {
                sequence: SequenceSection::default(),
                pre: None,
                post: None,
                task: Vec::new(),
            },
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.manifest.sequence.mode = mode;
        self
    }

    pub fn stall_timeout(mut self, value: &str) -> Self {
        self.manifest.sequence.stall_timeout = Some(value.to_string());
        self
    }

    pub fn pre(mut self, entry: TaskEntry) -> Self {
        self.manifest.pre = Some(entry);
        self
    }

    pub fn post(mut self, entry: TaskEntry) -> Self {
        self.manifest.post = Some(entry);
        self
    }

    pub fn task(mut self, entry: TaskEntry) -> Self {
        self.manifest.task.push(entry);
        self
    }

    pub fn raw(self) -> RawManifest {
        self.manifest
    }

    pub fn build(self) -> Manifest {
        Manifest::try_from(self.manifest).expect("Failed to build valid manifest from builder")
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskEntry`.
pub struct TaskEntryBuilder {
    entry: TaskEntry,
}

impl TaskEntryBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            entry: TaskEntry {
                name: None,
                cmd: cmd.to_string(),
                affinity: Affinity::Background,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.entry.name = Some(name.to_string());
        self
    }

    pub fn privileged(mut self) -> Self {
        self.entry.affinity = Affinity::Privileged;
        self
    }

    pub fn build(self) -> TaskEntry {
        self.entry
    }
}
