// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{Manifest, RawManifest};
use crate::errors::Result;

/// Load a manifest from `path` without validating it.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] to
/// also check names, commands and durations.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawManifest> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let manifest: RawManifest = toml::from_str(&contents)?;
    debug!(path = %path.display(), tasks = manifest.task.len(), "manifest parsed");

    Ok(manifest)
}

/// Load a manifest from `path` and validate it.
///
/// This is the entry point the CLI uses:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - at least one task in some phase,
///   - non-empty commands and unique task names,
///   - a parsable `stall_timeout`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Manifest> {
    let raw = load_from_path(&path)?;
    Manifest::try_from(raw)
}
