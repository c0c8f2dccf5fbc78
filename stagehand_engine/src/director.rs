use serde::Serialize;

use crate::config::ViolationPolicy;
use crate::error::{escalate, EngineError, InvariantViolation};
use crate::finale::Finale;
use crate::registry::Cutscene;
use crate::resources::ResourceSet;
use crate::script::ScriptContext;
use crate::sequencer::{Progress, Sequencer};
use crate::task::Task;
use crate::types::ActorId;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectorState {
    NotStarted,
    Running,
    Skipping,
    Ended,
}

impl DirectorState {
    pub fn as_str(self) -> &'static str {
        match self {
            DirectorState::NotStarted => "not_started",
            DirectorState::Running => "running",
            DirectorState::Skipping => "skipping",
            DirectorState::Ended => "ended",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Completed,
    Skipped,
    /// The host scene went away mid-run.
    TornDown,
    /// A controlled actor could not be locked at begin.
    Aborted,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EndReason::Completed => "completed",
            EndReason::Skipped => "skipped",
            EndReason::TornDown => "torn_down",
            EndReason::Aborted => "aborted",
        }
    }
}

/// Runs one cutscene instance from begin to end.
///
/// Whatever path ends the run (completion, skip, teardown, or an abort at
/// begin), the end step runs exactly once and leaves the world in the state
/// a full playback would: every declared load-bearing effect is settled,
/// every resource the script acquired is released, and every actor locked at
/// begin is unlocked.
pub struct Director {
    name: String,
    root: Option<Task>,
    finale: Finale,
    actors: Vec<ActorId>,
    locked: Vec<ActorId>,
    resources: ResourceSet,
    state: DirectorState,
    was_skipped: bool,
    end_reason: Option<EndReason>,
    policy: ViolationPolicy,
}

impl Director {
    pub fn new(cutscene: Cutscene, policy: ViolationPolicy) -> Self {
        let (name, root, finale, actors) = cutscene.into_parts();
        Self {
            name,
            root: Some(root),
            finale,
            actors,
            locked: Vec::new(),
            resources: ResourceSet::new(),
            state: DirectorState::NotStarted,
            was_skipped: false,
            end_reason: None,
            policy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> DirectorState {
        self.state
    }

    pub fn was_skipped(&self) -> bool {
        self.was_skipped
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn is_ended(&self) -> bool {
        self.state == DirectorState::Ended
    }

    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    pub fn finale(&self) -> &Finale {
        &self.finale
    }

    /// Locks the controlled actors and runs the root task up to its first
    /// suspension point.
    pub fn begin(&mut self, world: &mut World, sequencer: &Sequencer) -> DirectorState {
        if self.state != DirectorState::NotStarted {
            self.misuse(world, "begin");
            return self.state;
        }
        world.log_event(format!("director.begin {}", self.name));

        let mut refused = None;
        for actor in &self.actors {
            match world.actors_mut().lock(actor) {
                Ok(()) => {
                    world.log_event(format!("actor.lock {actor}"));
                    self.locked.push(actor.clone());
                }
                Err(err) => {
                    refused = Some(err);
                    break;
                }
            }
        }
        if let Some(err) = refused {
            escalate(self.policy, world, &self.name, err.into());
            self.was_skipped = true;
            self.end(world, EndReason::Aborted);
            return self.state;
        }

        self.state = DirectorState::Running;
        if self.step_root(world, sequencer, 0.0) == Progress::Complete {
            self.end(world, EndReason::Completed);
        }
        self.state
    }

    pub fn update(
        &mut self,
        world: &mut World,
        sequencer: &Sequencer,
        elapsed: f32,
    ) -> DirectorState {
        match self.state {
            DirectorState::Running => {
                if self.step_root(world, sequencer, elapsed) == Progress::Complete {
                    self.end(world, EndReason::Completed);
                }
            }
            DirectorState::Ended => {}
            DirectorState::NotStarted | DirectorState::Skipping => self.misuse(world, "update"),
        }
        self.state
    }

    /// Cancels the run and ends it immediately. Only honoured while running;
    /// returns whether the skip took effect.
    pub fn request_skip(&mut self, world: &mut World) -> bool {
        if self.state != DirectorState::Running {
            log::info!("skip of '{}' ignored while {}", self.name, self.state.as_str());
            return false;
        }
        self.state = DirectorState::Skipping;
        self.was_skipped = true;
        if let Some(root) = self.root.as_mut() {
            root.cancel();
        }
        world.log_event(format!("director.skip {}", self.name));
        self.end(world, EndReason::Skipped);
        true
    }

    /// Forced end, for when the hosting scene goes away. A no-op once ended.
    pub fn teardown(&mut self, world: &mut World) {
        if self.state != DirectorState::Ended {
            self.end(world, EndReason::TornDown);
        }
    }

    fn step_root(&mut self, world: &mut World, sequencer: &Sequencer, elapsed: f32) -> Progress {
        let Some(root) = self.root.as_mut() else {
            return Progress::Complete;
        };
        let mut cx = ScriptContext::new(
            &self.name,
            world,
            &mut self.resources,
            &mut self.finale,
            self.policy,
        );
        sequencer.step(root, elapsed, &mut cx)
    }

    fn end(&mut self, world: &mut World, reason: EndReason) {
        if self.state == DirectorState::Ended {
            return;
        }

        if let Some(mut root) = self.root.take() {
            root.cancel();
        }

        let mut failures = self.finale.settle(world);
        failures.extend(self.resources.release_all(world));
        for (label, err) in failures {
            self.report_cleanup(world, &label, err);
        }

        for actor in std::mem::take(&mut self.locked) {
            match world.actors_mut().unlock(&actor) {
                Ok(()) => world.log_event(format!("actor.unlock {actor}")),
                Err(err) => self.report_cleanup(world, &format!("unlock {actor}"), err.into()),
            }
        }

        self.state = DirectorState::Ended;
        self.end_reason = Some(reason);
        world.log_event(format!("director.end {} ({})", self.name, reason.as_str()));
    }

    fn report_cleanup(&self, world: &mut World, label: &str, err: EngineError) {
        let context = format!("{} end: {label}", self.name);
        escalate(self.policy, world, &context, err);
    }

    fn misuse(&self, world: &mut World, operation: &'static str) {
        let violation = InvariantViolation::DirectorState {
            name: self.name.clone(),
            operation,
            state: self.state.as_str(),
        };
        escalate(self.policy, world, "director", violation.into());
    }
}

impl Drop for Director {
    fn drop(&mut self) {
        if matches!(self.state, DirectorState::Running | DirectorState::Skipping) {
            log::error!(
                "director '{}' dropped while {} without ending; {} actor lock(s) leaked",
                self.name,
                self.state.as_str(),
                self.locked.len()
            );
        }
    }
}

impl std::fmt::Debug for Director {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Director")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("was_skipped", &self.was_skipped)
            .field("end_reason", &self.end_reason)
            .field("resources", &self.resources.len())
            .finish()
    }
}
