// tests/manifest_loading.rs

mod common;
use crate::common::TestResult;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use sequencer::config::{Manifest, load_and_validate, load_from_path, parse_duration};
use sequencer::errors::SequencerError;
use sequencer::plan::Work;
use sequencer::types::{Affinity, Mode};
use sequencer_test_utils::builders::{ManifestBuilder, TaskEntryBuilder};
use tempfile::TempDir;

fn write_manifest(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("Sequence.toml");
    fs::write(&path, contents).expect("write manifest");
    path
}

fn config_error(result: sequencer::errors::Result<Manifest>) -> String {
    match result {
        Err(SequencerError::Configuration(msg)) => msg,
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn full_manifest_loads_with_names_and_affinities() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_manifest(
        &dir,
        r#"
[sequence]
mode = "fanout"
stall_timeout = "30s"
privileged_thread_name = "ui"

[pre]
cmd = "echo prepare"
affinity = "privileged"

[[task]]
name = "compile"
cmd = "echo compile"

[[task]]
cmd = "echo test"

[post]
name = "report"
cmd = "echo done"
"#,
    );

    let manifest = load_and_validate(&path)?;

    assert_eq!(manifest.mode(), Mode::Fanout);
    assert_eq!(manifest.stall_timeout(), Some(Duration::from_secs(30)));
    assert_eq!(manifest.privileged_thread_name(), "ui");
    assert!(manifest.needs_privileged());

    let names: Vec<&str> = manifest.entries().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["pre", "compile", "task-2", "report"]);

    let pre = manifest.pre.as_ref().expect("pre entry");
    assert_eq!(pre.affinity, Affinity::Privileged);
    assert_eq!(manifest.tasks[1].affinity, Affinity::Background);

    Ok(())
}

#[test]
fn minimal_manifest_uses_defaults() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_manifest(&dir, "[[task]]\ncmd = \"true\"\n");

    let manifest = load_and_validate(&path)?;
    assert_eq!(manifest.mode(), Mode::Chained);
    assert_eq!(manifest.stall_timeout(), None);
    assert_eq!(manifest.privileged_thread_name(), "privileged");
    assert!(!manifest.needs_privileged());
    assert!(manifest.pre.is_none());
    assert!(manifest.post.is_none());

    Ok(())
}

#[test]
fn legacy_mode_names_and_ui_affinity_are_accepted() -> TestResult {
    let dir = TempDir::new()?;

    let path = write_manifest(&dir, "[sequence]\nmode = \"oneway\"\n[[task]]\ncmd = \"true\"\n");
    assert_eq!(load_and_validate(&path)?.mode(), Mode::Fanout);

    let path = write_manifest(
        &dir,
        "[sequence]\nmode = \"coherence\"\n[[task]]\ncmd = \"true\"\n",
    );
    assert_eq!(load_and_validate(&path)?.mode(), Mode::Chained);

    assert_eq!("ui".parse::<Affinity>()?, Affinity::Privileged);
    assert_eq!(" Background ".parse::<Affinity>()?, Affinity::Background);
    assert_eq!("ONEWAY".parse::<Mode>()?, Mode::Fanout);
    assert!("sideways".parse::<Mode>().is_err());

    Ok(())
}

#[test]
fn unknown_mode_is_a_parse_error() -> TestResult {
    let dir = TempDir::new()?;
    let path = write_manifest(&dir, "[sequence]\nmode = \"sideways\"\n[[task]]\ncmd = \"true\"\n");

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, SequencerError::Toml(_)), "got {err:?}");
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = load_and_validate(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, SequencerError::Io(_)), "got {err:?}");
}

#[test]
fn manifest_without_tasks_is_rejected() {
    let msg = config_error(Manifest::try_from(ManifestBuilder::new().raw()));
    assert!(msg.contains("at least one"), "got {msg}");
}

#[test]
fn duplicate_names_are_rejected_across_phases() {
    let raw = ManifestBuilder::new()
        .pre(TaskEntryBuilder::new("true").name("build").build())
        .task(TaskEntryBuilder::new("true").name("build").build())
        .raw();

    let msg = config_error(Manifest::try_from(raw));
    assert_eq!(msg, "duplicate task name 'build'");
}

#[test]
fn explicit_name_colliding_with_default_name_is_rejected() {
    let raw = ManifestBuilder::new()
        .task(TaskEntryBuilder::new("true").name("task-2").build())
        .task(TaskEntryBuilder::new("true").build())
        .raw();

    let msg = config_error(Manifest::try_from(raw));
    assert!(msg.contains("task-2"), "got {msg}");
}

#[test]
fn empty_command_is_rejected() {
    let raw = ManifestBuilder::new()
        .task(TaskEntryBuilder::new("   ").name("blank").build())
        .raw();

    let msg = config_error(Manifest::try_from(raw));
    assert_eq!(msg, "task 'blank' has an empty cmd");
}

#[test]
fn bad_stall_timeout_is_rejected() {
    let raw = ManifestBuilder::new()
        .stall_timeout("soon")
        .task(TaskEntryBuilder::new("true").build())
        .raw();

    let msg = config_error(Manifest::try_from(raw));
    assert!(msg.starts_with("[sequence].stall_timeout:"), "got {msg}");
}

#[test]
fn parse_duration_accepts_supported_units() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration(" 5s "), Ok(Duration::from_secs(5)));
    assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));

    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("3d").is_err());
}

#[test]
fn parse_duration_rejects_values_that_overflow() {
    let err = parse_duration("5124095576030432h").unwrap_err();
    assert!(err.contains("too large"), "got {err}");
    assert!(parse_duration("307445734561825861m").is_err());
    assert_eq!(
        parse_duration("18446744073709551615s"),
        Ok(Duration::from_secs(u64::MAX))
    );
}

#[test]
fn huge_stall_timeout_in_manifest_is_a_configuration_error() {
    let raw = ManifestBuilder::new()
        .stall_timeout("5124095576030432h")
        .task(TaskEntryBuilder::new("true").build())
        .raw();

    let msg = config_error(Manifest::try_from(raw));
    assert!(msg.contains("too large"), "got {msg}");
}

#[test]
fn to_builder_keeps_phase_order_and_affinities() {
    let manifest = ManifestBuilder::new()
        .mode(Mode::Fanout)
        .pre(TaskEntryBuilder::new("echo a").build())
        .task(TaskEntryBuilder::new("echo b").privileged().build())
        .task(TaskEntryBuilder::new("echo c").build())
        .post(TaskEntryBuilder::new("echo d").privileged().build())
        .build();

    let mut seen = Vec::new();
    let plan = manifest
        .to_builder(|entry| {
            seen.push(entry.name.clone());
            let work: Work = Box::new(|| {});
            work
        })
        .build(manifest.mode());

    assert_eq!(seen, vec!["pre", "task-1", "task-2", "post"]);
    assert_eq!(plan.mode(), Mode::Fanout);
    assert_eq!(plan.len(), 4);

    let pre = plan.pre_task().expect("pre task");
    assert_eq!(pre.name(), Some("pre"));
    assert!(pre.is_defined());

    let main: Vec<(Option<&str>, Affinity)> = plan
        .main_tasks()
        .iter()
        .map(|t| (t.name(), t.affinity()))
        .collect();
    assert_eq!(
        main,
        vec![
            (Some("task-1"), Affinity::Privileged),
            (Some("task-2"), Affinity::Background),
        ]
    );

    let post = plan.post_task().expect("post task");
    assert_eq!(post.affinity(), Affinity::Privileged);
}
