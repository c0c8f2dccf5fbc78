use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use anyhow::{Context, Result};
use serde::Deserialize;
use tempfile::tempdir;

#[derive(Debug, Deserialize, PartialEq, Eq)]
struct FlagFile {
    flags: Vec<String>,
    counters: std::collections::BTreeMap<String, i64>,
}

#[derive(Debug, Deserialize)]
struct Completion {
    cutscene: String,
    actor: String,
    outcome: String,
}

#[derive(Debug, Deserialize)]
struct RunSummary {
    scene: String,
    ticks: u32,
    skips: Vec<u32>,
    completions: Vec<Completion>,
    unfinished: usize,
}

#[derive(Debug, Deserialize)]
struct EventLog {
    events: Vec<EventLogEntry>,
}

#[derive(Debug, Deserialize)]
struct EventLogEntry {
    sequence: u32,
    tick: u32,
    label: String,
}

fn host(args: &[&str]) -> Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_stagehand_host"))
        .args(args)
        .output()
        .context("running stagehand_host")
}

fn run_to(dir: &Path, name: &str, extra: &[&str]) -> Result<(FlagFile, RunSummary)> {
    let flags = dir.join(format!("{name}_flags.json"));
    let summary = dir.join(format!("{name}_summary.json"));
    let flags_arg = flags.to_str().context("utf-8 temp path")?;
    let summary_arg = summary.to_str().context("utf-8 temp path")?;

    let mut args = vec!["--flags", flags_arg, "--summary-json", summary_arg];
    args.extend_from_slice(extra);
    let output = host(&args)?;
    assert!(
        output.status.success(),
        "stagehand_host {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let flags: FlagFile = serde_json::from_str(&fs::read_to_string(&flags)?)
        .with_context(|| format!("parsing {}", flags.display()))?;
    let summary: RunSummary = serde_json::from_str(&fs::read_to_string(&summary)?)
        .with_context(|| format!("parsing {}", summary.display()))?;
    Ok((flags, summary))
}

#[test]
fn harbor_scene_plays_through() -> Result<()> {
    let dir = tempdir().context("creating temporary directory")?;
    let (flags, summary) = run_to(dir.path(), "full", &[])?;

    assert_eq!(summary.scene, "harbor");
    assert_eq!(summary.unfinished, 0);
    assert!(summary.skips.is_empty());
    let finished: Vec<(&str, &str)> = summary
        .completions
        .iter()
        .map(|completion| (completion.cutscene.as_str(), completion.outcome.as_str()))
        .collect();
    assert_eq!(
        finished,
        vec![
            ("greet", "completed"),
            ("dock_briefing", "completed"),
            ("ferry_ride", "completed"),
        ]
    );
    assert!(summary
        .completions
        .iter()
        .all(|completion| completion.actor == "player"));
    assert_eq!(flags.flags, vec!["briefed", "crossed", "greeted"]);
    assert_eq!(flags.counters.get("ferry_trips"), Some(&1));
    Ok(())
}

#[test]
fn skipped_runs_save_the_same_flags() -> Result<()> {
    let dir = tempdir().context("creating temporary directory")?;
    let (full, summary) = run_to(dir.path(), "full", &[])?;
    assert!(summary.ticks > 100, "harbor run unexpectedly short");

    // Nothing is running until the first tick fires the opening trigger.
    let step = (summary.ticks / 12).max(1);
    let mut tick = 1;
    while tick < summary.ticks {
        let tick_arg = tick.to_string();
        let name = format!("skip_{tick}");
        let (skipped, skipped_summary) = run_to(dir.path(), &name, &["--skip-at", &tick_arg])?;
        assert_eq!(skipped, full, "flags diverged when skipping at tick {tick}");
        assert_eq!(skipped_summary.unfinished, 0);
        assert!(skipped_summary
            .completions
            .iter()
            .any(|completion| completion.outcome == "skipped"));
        tick += step;
    }
    Ok(())
}

#[test]
fn skipping_every_cutscene_still_saves_the_same_flags() -> Result<()> {
    let dir = tempdir().context("creating temporary directory")?;
    let (full, _) = run_to(dir.path(), "full", &[])?;

    let ticks: Vec<String> = (0..400).step_by(5).map(|tick| tick.to_string()).collect();
    let mut extra = Vec::new();
    for tick in &ticks {
        extra.push("--skip-at");
        extra.push(tick.as_str());
    }
    let (skipped, summary) = run_to(dir.path(), "skip_all", &extra)?;

    assert_eq!(skipped, full);
    assert!(summary
        .completions
        .iter()
        .all(|completion| completion.outcome == "skipped"));
    Ok(())
}

#[test]
fn missing_cutscene_is_reported_and_the_run_continues() -> Result<()> {
    let dir = tempdir().context("creating temporary directory")?;
    let scene = dir.path().join("scene.json");
    fs::write(
        &scene,
        r#"{
            "name": "typo",
            "actors": [{ "id": "player", "position": [0.0, 0.0] }],
            "triggers": [
                { "cutscene": "greeet", "actor": "player" },
                { "cutscene": "greet", "actor": "player" }
            ]
        }"#,
    )?;
    let events = dir.path().join("events.json");
    let scene_arg = scene.to_str().context("utf-8 temp path")?;
    let events_arg = events.to_str().context("utf-8 temp path")?;

    let (flags, summary) = run_to(
        dir.path(),
        "typo",
        &["--scene", scene_arg, "--event-log-json", events_arg],
    )?;

    let outcomes: Vec<&str> = summary
        .completions
        .iter()
        .map(|completion| completion.outcome.as_str())
        .collect();
    assert_eq!(outcomes, vec!["missing", "completed"]);
    assert_eq!(flags.flags, vec!["greeted"]);

    let log: EventLog = serde_json::from_str(&fs::read_to_string(&events)?)?;
    assert!(log
        .events
        .iter()
        .any(|entry| entry.label.starts_with("error.content registry:")));
    assert!(log
        .events
        .windows(2)
        .all(|pair| pair[0].sequence + 1 == pair[1].sequence && pair[0].tick <= pair[1].tick));
    assert_eq!(
        log.events.last().map(|entry| entry.label.as_str()),
        Some("stage.unload")
    );
    Ok(())
}

#[test]
fn tick_budget_tears_down_unfinished_cutscenes() -> Result<()> {
    let dir = tempdir().context("creating temporary directory")?;
    let (full, _) = run_to(dir.path(), "full", &[])?;
    let (short, summary) = run_to(dir.path(), "short", &["--ticks", "40"])?;

    assert_eq!(summary.unfinished, 1);
    assert_eq!(
        summary.completions.last().map(|completion| completion.outcome.as_str()),
        Some("torn_down")
    );
    assert!(short.flags.contains(&"briefed".to_string()));
    assert!(short.flags.len() < full.flags.len());
    Ok(())
}

#[test]
fn list_prints_the_library() -> Result<()> {
    let output = host(&["--list"])?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    for name in ["greet", "dock_briefing", "ferry_ride"] {
        assert!(stdout.contains(name), "missing {name} in:\n{stdout}");
    }
    Ok(())
}

#[test]
fn invalid_arguments_fail() -> Result<()> {
    let output = host(&["--tick-seconds", "0"])?;
    assert!(!output.status.success());
    Ok(())
}
