// src/exec/mod.rs

//! Execution-context layer.
//!
//! The coordinator never runs task bodies itself; it hands them to a
//! [`Dispatcher`], which decides *where* they run.
//!
//! - [`backend`] provides the `Dispatcher` trait and the default
//!   thread-backed `ThreadDispatcher`.
//! - [`privileged`] owns the single serialized "privileged" context: one
//!   dedicated thread draining an urgent and a normal job queue.
//! - [`background`] spawns one fresh, detached worker thread per job.
//! - [`command`] turns a shell command into task work (used by manifests).

pub mod backend;
pub mod background;
pub mod command;
pub mod privileged;

pub use backend::{Dispatcher, ThreadDispatcher};
pub use background::spawn_worker;
pub use privileged::{PrivilegedContext, PrivilegedHandle};

/// A unit of work handed to an execution context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where a job lands in the privileged queue.
///
/// - `Normal`: behind everything already queued.
/// - `Urgent`: ahead of every queued `Normal` job. Jobs of the same priority
///   keep their submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Normal,
    Urgent,
}
