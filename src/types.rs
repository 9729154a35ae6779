use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which execution context a task must run on.
///
/// - `Privileged`: the single serialized context (the "UI" context).
/// - `Background`: a freshly spawned worker thread, one per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Affinity {
    Privileged,
    Background,
}

impl Default for Affinity {
    fn default() -> Self {
        Affinity::Background
    }
}

impl FromStr for Affinity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "privileged" | "ui" => Ok(Affinity::Privileged),
            "background" => Ok(Affinity::Background),
            other => Err(format!(
                "invalid affinity: {other} (expected \"privileged\" or \"background\")"
            )),
        }
    }
}

/// Main-phase dispatch strategy.
///
/// - `Chained`: main tasks run strictly one after another, in plan order.
/// - `Fanout`: every main task is dispatched at once; the post phase is
///   triggered as soon as the dispatches are issued, without waiting for
///   them to finish.
///
/// `coherence` and `oneway` are accepted as aliases when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[serde(alias = "coherence")]
    Chained,
    #[serde(alias = "oneway")]
    Fanout,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Chained
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chained" | "coherence" => Ok(Mode::Chained),
            "fanout" | "oneway" => Ok(Mode::Fanout),
            other => Err(format!(
                "invalid mode: {other} (expected \"chained\" or \"fanout\")"
            )),
        }
    }
}

/// Coordinator phase. `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pre,
    Main,
    Post,
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Pre => "pre",
            Phase::Main => "main",
            Phase::Post => "post",
            Phase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}
