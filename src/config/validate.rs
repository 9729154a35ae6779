// src/config/validate.rs

use std::collections::HashSet;
use std::time::Duration;

use crate::config::model::{Manifest, NamedEntry, RawManifest, TaskEntry};
use crate::errors::{Result, SequencerError};

impl TryFrom<RawManifest> for Manifest {
    type Error = SequencerError;

    fn try_from(raw: RawManifest) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        validate_sequence_section(&raw)?;

        let stall_timeout = match raw.sequence.stall_timeout {
            Some(ref s) => Some(parse_duration(s).map_err(|e| {
                SequencerError::Configuration(format!("[sequence].stall_timeout: {e}"))
            })?),
            None => None,
        };

        let mut names = HashSet::new();
        let pre = raw
            .pre
            .as_ref()
            .map(|entry| resolve_entry(entry, "pre", &mut names))
            .transpose()?;
        let tasks = raw
            .task
            .iter()
            .enumerate()
            .map(|(i, entry)| resolve_entry(entry, &format!("task-{}", i + 1), &mut names))
            .collect::<Result<Vec<_>>>()?;
        let post = raw
            .post
            .as_ref()
            .map(|entry| resolve_entry(entry, "post", &mut names))
            .transpose()?;

        Ok(Manifest::new_unchecked(
            raw.sequence,
            pre,
            post,
            tasks,
            stall_timeout,
        ))
    }
}

fn ensure_has_tasks(raw: &RawManifest) -> Result<()> {
    if raw.task.is_empty() && raw.pre.is_none() && raw.post.is_none() {
        return Err(SequencerError::Configuration(
            "manifest must contain at least one [[task]], [pre] or [post] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_sequence_section(raw: &RawManifest) -> Result<()> {
    if raw.sequence.privileged_thread_name.trim().is_empty() {
        return Err(SequencerError::Configuration(
            "[sequence].privileged_thread_name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn resolve_entry(
    entry: &TaskEntry,
    default_name: &str,
    seen: &mut HashSet<String>,
) -> Result<NamedEntry> {
    let name = entry
        .name
        .as_deref()
        .unwrap_or(default_name)
        .trim()
        .to_string();

    if name.is_empty() {
        return Err(SequencerError::Configuration(format!(
            "task '{default_name}' has an empty name"
        )));
    }
    if entry.cmd.trim().is_empty() {
        return Err(SequencerError::Configuration(format!(
            "task '{name}' has an empty cmd"
        )));
    }
    if !seen.insert(name.clone()) {
        return Err(SequencerError::Configuration(format!(
            "duplicate task name '{name}'"
        )));
    }

    Ok(NamedEntry {
        name,
        cmd: entry.cmd.clone(),
        affinity: entry.affinity,
    })
}

/// Parse a duration such as `"500ms"`, `"30s"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => scaled_secs(value, 60, num_part),
        "h" => scaled_secs(value, 60 * 60, num_part),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}

fn scaled_secs(
    value: u64,
    secs_per_unit: u64,
    num_part: &str,
) -> std::result::Result<Duration, String> {
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{num_part}' is too large"))
}
