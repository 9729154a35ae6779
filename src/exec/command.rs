// src/exec/command.rs

//! Shell commands as task work.

use std::process::{Command, ExitStatus};

use anyhow::{Context, Result, bail};
use tracing::{error, info};

/// Build task work that runs `cmd` through the platform shell.
///
/// The work runs synchronously on whichever context the task is dispatched
/// to and inherits the host's stdio. A spawn failure or non-zero exit
/// status panics inside the work, which is how any other failing task
/// body behaves: the coordinator does not observe it and a chained run
/// stalls unless a stall timeout is configured.
pub fn shell_work(name: String, cmd: String) -> impl FnOnce() + Send + 'static {
    move || {
        if let Err(err) = run_shell_command(&name, &cmd) {
            error!(task = %name, error = %err, "task command failed");
            panic!("task '{name}' failed: {err:#}");
        }
    }
}

/// Run `cmd` to completion and fail unless it exits successfully.
pub fn run_shell_command(name: &str, cmd: &str) -> Result<()> {
    info!(task = %name, cmd = %cmd, "starting task process");

    let status = shell(cmd)
        .status()
        .with_context(|| format!("spawning process for task '{name}'"))?;

    let code = exit_code(status);
    info!(
        task = %name,
        exit_code = code,
        success = status.success(),
        "task process exited"
    );

    if !status.success() {
        bail!("command `{cmd}` exited with status {code}");
    }
    Ok(())
}

fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
