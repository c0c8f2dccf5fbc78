use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;
use stagehand_engine::{Completion, FlagSnapshot, MemoryFlags, RecordingEffects, Stage, World};

use crate::cli::RunArgs;
use crate::demo;
use crate::flag_file::FlagFile;
use crate::scene::SceneConfig;

#[derive(Debug, Serialize)]
struct EventLogEntry {
    sequence: u32,
    tick: u32,
    label: String,
}

#[derive(Debug, Serialize)]
struct EventLog {
    events: Vec<EventLogEntry>,
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    scene: &'a str,
    ticks: u32,
    tick_seconds: f32,
    skips: Vec<u32>,
    completions: &'a [Completion],
    unfinished: usize,
    effect_cues: usize,
    flags: &'a FlagSnapshot,
}

pub fn execute(args: RunArgs) -> Result<()> {
    let RunArgs {
        scene,
        flags,
        ticks,
        tick_seconds,
        skip_at,
        event_log_json,
        summary_json,
        lenient,
        verbose,
    } = args;

    let scene = match scene.as_deref() {
        Some(path) => SceneConfig::from_json_file(path)?,
        None => SceneConfig::harbor(),
    };
    let mut flag_file = FlagFile::from_json_file(flags.as_deref()).context("loading flag file")?;

    let effects = RecordingEffects::new();
    let world = World::in_memory()
        .with_actors(scene.stage_actors())
        .with_flags(MemoryFlags::from_snapshot(flag_file.snapshot().clone()))
        .with_effects(effects.clone())
        .with_dialogue(demo::dialogue());
    let mut stage = Stage::new(world, scene.engine_config(lenient)).with_registry(demo::registry());
    for trigger in &scene.triggers {
        stage.place(trigger.build());
    }

    let mut log = EventLog { events: Vec::new() };
    drain_events(&mut stage, 0, &mut log);

    let mut skips = Vec::new();
    let mut elapsed_ticks = 0;
    while elapsed_ticks < ticks && stage.trigger_count() > 0 {
        if skip_at.binary_search(&elapsed_ticks).is_ok() {
            let skipped = stage.skip_all();
            if skipped > 0 {
                skips.push(elapsed_ticks);
            }
            log::info!("tick {elapsed_ticks}: skipped {skipped} cutscene(s)");
        }
        for completion in stage.tick(tick_seconds) {
            log::debug!(
                "tick {elapsed_ticks}: {} finished ({})",
                completion.cutscene,
                completion.outcome.as_str()
            );
        }
        drain_events(&mut stage, elapsed_ticks, &mut log);
        elapsed_ticks += 1;
    }

    let unfinished = stage.running();
    if unfinished > 0 {
        eprintln!(
            "[stagehand_host] warning: {unfinished} cutscene(s) still running after {ticks} ticks; tearing down"
        );
    }
    stage.unload();
    drain_events(&mut stage, elapsed_ticks, &mut log);

    let completions = stage.take_completions();
    for completion in &completions {
        println!(
            "{:<14} {:<10} actor={} trigger={}",
            completion.cutscene,
            completion.outcome.as_str(),
            completion.actor,
            completion.trigger
        );
    }

    let final_flags = stage.world().flags().snapshot();
    flag_file.update(final_flags.clone());
    if flag_file.save().context("saving flag file")? {
        if let Some(path) = flags.as_ref() {
            println!("Saved flags to {}", path.display());
        }
    }

    if verbose {
        println!("\nEvent log:");
        for entry in &log.events {
            println!("  [{:>4}] {}", entry.tick, entry.label);
        }
    }

    if let Some(path) = event_log_json.as_ref() {
        write_json(path, &log).context("writing event log")?;
        println!("Saved event log to {}", path.display());
    }

    if let Some(path) = summary_json.as_ref() {
        let summary = RunSummary {
            scene: &scene.name,
            ticks: elapsed_ticks,
            tick_seconds,
            skips,
            completions: &completions,
            unfinished,
            effect_cues: effects.events().len(),
            flags: &final_flags,
        };
        write_json(path, &summary).context("writing run summary")?;
        println!("Saved run summary to {}", path.display());
    }

    Ok(())
}

fn drain_events(stage: &mut Stage, tick: u32, log: &mut EventLog) {
    for label in stage.world_mut().take_events() {
        let sequence = log.events.len() as u32;
        log.events.push(EventLogEntry {
            sequence,
            tick,
            label,
        });
    }
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(value).context("serializing JSON")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
