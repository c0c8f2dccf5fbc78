use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

/// Command-line host for the stagehand cutscene engine.
#[derive(Parser, Debug)]
#[command(
    about = "Runs stagehand cutscenes against an in-memory scene and records the outcome",
    version
)]
pub struct Args {
    /// Scene description JSON (defaults to the built-in harbor scene)
    #[arg(long)]
    pub scene: Option<PathBuf>,

    /// JSON flag file loaded before the run and written back after it
    #[arg(long)]
    pub flags: Option<PathBuf>,

    /// Maximum number of ticks to simulate
    #[arg(long, default_value_t = 600)]
    pub ticks: u32,

    /// Seconds of game time per tick
    #[arg(long, default_value_t = 1.0 / 60.0)]
    pub tick_seconds: f32,

    /// Skip every running cutscene before this tick (repeatable)
    #[arg(long, value_name = "TICK")]
    pub skip_at: Vec<u32>,

    /// Path to write the engine event log as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Path to write the run summary as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Log engine invariant violations instead of aborting on them
    #[arg(long)]
    pub lenient: bool,

    /// Print the event log and enable debug logging
    #[arg(long)]
    pub verbose: bool,

    /// List the built-in cutscene library and exit
    #[arg(long)]
    pub list: bool,
}

#[derive(Debug)]
pub enum Command {
    List,
    Run(RunArgs),
}

impl Command {
    pub fn verbose(&self) -> bool {
        match self {
            Command::List => false,
            Command::Run(args) => args.verbose,
        }
    }
}

#[derive(Debug)]
pub struct RunArgs {
    pub scene: Option<PathBuf>,
    pub flags: Option<PathBuf>,
    pub ticks: u32,
    pub tick_seconds: f32,
    pub skip_at: Vec<u32>,
    pub event_log_json: Option<PathBuf>,
    pub summary_json: Option<PathBuf>,
    pub lenient: bool,
    pub verbose: bool,
}

pub fn parse() -> Result<Command> {
    let args = Args::parse();
    args.into_command()
}

impl Args {
    fn into_command(self) -> Result<Command> {
        if self.list {
            if !self.skip_at.is_empty() || self.scene.is_some() || self.flags.is_some() {
                bail!("--list cannot be combined with a run");
            }
            return Ok(Command::List);
        }

        if self.ticks == 0 {
            bail!("--ticks must be at least 1");
        }
        if !self.tick_seconds.is_finite() || self.tick_seconds <= 0.0 {
            bail!(
                "--tick-seconds must be a positive number (got {})",
                self.tick_seconds
            );
        }
        if let Some(tick) = self.skip_at.iter().find(|tick| **tick >= self.ticks) {
            bail!("--skip-at {tick} is beyond the last tick ({})", self.ticks - 1);
        }

        let mut skip_at = self.skip_at;
        skip_at.sort_unstable();
        skip_at.dedup();

        Ok(Command::Run(RunArgs {
            scene: self.scene,
            flags: self.flags,
            ticks: self.ticks,
            tick_seconds: self.tick_seconds,
            skip_at,
            event_log_json: self.event_log_json,
            summary_json: self.summary_json,
            lenient: self.lenient,
            verbose: self.verbose,
        }))
    }
}
