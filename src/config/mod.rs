// src/config/mod.rs

//! Sequence manifests: declarative task lists for the CLI.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a manifest from disk (`loader.rs`).
//! - Validate it and parse duration strings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{Manifest, NamedEntry, RawManifest, SequenceSection, TaskEntry};
pub use validate::parse_duration;
