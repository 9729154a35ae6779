// src/errors.rs

//! Crate-wide error type and result alias.

use std::time::Duration;

use thiserror::Error;

use crate::plan::TaskId;
use crate::types::Phase;

#[derive(Error, Debug)]
pub enum SequencerError {
    /// The environment cannot provide an execution context the plan needs
    /// (e.g. a privileged task with no privileged context), or the
    /// manifest describing the plan is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A task was run without any work bound to it.
    #[error("Linkage error: task {id} has no work bound; use define() before running it")]
    Linkage { id: TaskId },

    /// Raised only when a stall timeout is configured and the coordinator
    /// waited that long for a completion signal.
    #[error("Coordinator stalled in {phase:?} phase (no signal for {waited:?})")]
    Stalled { phase: Phase, waited: Duration },

    #[error("Coordinator has already terminated")]
    Terminated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SequencerError>;
