// src/plan/mod.rs

//! Plans: what to run, where, and in which order.
//!
//! - [`task`] defines the unit of work (`Task`) and its identity.
//! - [`builder`] accumulates tasks into a finalized [`Plan`].
//! - [`model`] holds the immutable `Plan` value consumed by the coordinator.

pub mod builder;
pub mod model;
pub mod task;

pub use builder::PlanBuilder;
pub use model::{Plan, PlanParts};
pub use task::{CompletionNotifier, Task, TaskId, Work};
