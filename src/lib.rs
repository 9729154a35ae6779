// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plan;
pub mod types;

use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{Manifest, load_and_validate, parse_duration};
use crate::engine::{Coordinator, CoordinatorOptions};
use crate::exec::command::shell_work;
use crate::exec::{PrivilegedContext, ThreadDispatcher};
use crate::plan::Work;
use crate::types::Mode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading
/// - the privileged context + dispatcher
/// - plan building and the coordinator loop
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let manifest_path = PathBuf::from(&args.manifest);
    let manifest = load_and_validate(&manifest_path)?;

    let mode = args.mode.unwrap_or(manifest.mode());
    let stall_timeout = match args.stall_timeout {
        Some(ref s) => {
            Some(parse_duration(s).map_err(|e| anyhow::anyhow!("--stall-timeout: {e}"))?)
        }
        None => manifest.stall_timeout(),
    };

    if args.dry_run {
        print_dry_run(&manifest, mode);
        return Ok(());
    }

    // Only pay for the privileged thread when some task needs it.
    let privileged = if manifest.needs_privileged() {
        Some(PrivilegedContext::spawn(manifest.privileged_thread_name())?)
    } else {
        None
    };
    let dispatcher = match privileged {
        Some(ref ctx) => ThreadDispatcher::new(ctx.handle()),
        None => ThreadDispatcher::background_only(),
    };

    // Every task's work holds a clone of `in_flight`; once all of them have
    // run or been dropped the receiver sees the channel close.
    let (in_flight, mut drained) = mpsc::channel::<()>(1);
    let plan = manifest
        .to_builder(|entry| {
            let guard = in_flight.clone();
            let work = shell_work(entry.name.clone(), entry.cmd.clone());
            let work: Work = Box::new(move || {
                let _guard = guard;
                work();
            });
            work
        })
        .build(mode);
    drop(in_flight);

    info!(?mode, tasks = plan.len(), ?stall_timeout, "starting sequence");

    let options = CoordinatorOptions { stall_timeout };
    let coordinator = Coordinator::new(plan, dispatcher, options);
    let handle = coordinator.handle();

    // Ctrl-C -> cooperative terminate.
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("interrupted; terminating sequence");
            handle.terminate();
        });
    }

    handle.start()?;
    let outcome = coordinator.run().await;

    // Fan-out tasks may still be running after the coordinator terminates.
    debug!("waiting for in-flight tasks to finish");
    while drained.recv().await.is_some() {}

    if let Some(ctx) = privileged {
        tokio::task::spawn_blocking(move || ctx.shutdown()).await?;
    }

    let summary = outcome?;
    info!(
        dispatched = summary.dispatched,
        completed = summary.completed,
        "sequence finished"
    );
    Ok(())
}

/// Simple dry-run output: print mode and tasks per phase.
fn print_dry_run(manifest: &Manifest, mode: Mode) {
    println!("sequencer dry-run");
    println!("  mode = {mode:?}");
    if let Some(timeout) = manifest.stall_timeout() {
        println!("  stall_timeout = {timeout:?}");
    }
    println!(
        "  privileged_thread_name = {}",
        manifest.privileged_thread_name()
    );
    println!();

    if let Some(ref pre) = manifest.pre {
        println!("pre:");
        println!("  - {} [{:?}]: {}", pre.name, pre.affinity, pre.cmd);
    }

    println!("main ({}):", manifest.tasks.len());
    for entry in &manifest.tasks {
        println!("  - {} [{:?}]: {}", entry.name, entry.affinity, entry.cmd);
    }

    if let Some(ref post) = manifest.post {
        println!("post:");
        println!("  - {} [{:?}]: {}", post.name, post.affinity, post.cmd);
    }

    debug!("dry-run complete (no execution)");
}
