use std::fmt;

use serde::Serialize;

use crate::config::ViolationPolicy;
use crate::director::{Director, EndReason};
use crate::error::{escalate, InvariantViolation};
use crate::registry::CutsceneRegistry;
use crate::sequencer::Sequencer;
use crate::types::{ActorId, Rect, TriggerId};
use crate::world::World;

/// When a [`Stage`](crate::Stage) fires an armed trigger on its own.
pub enum TriggerCondition {
    /// Only when fired explicitly.
    Manual,
    /// While the trigger's actor stands inside the region.
    Region(Rect),
    When(Box<dyn Fn(&World) -> bool>),
}

impl TriggerCondition {
    pub fn when(predicate: impl Fn(&World) -> bool + 'static) -> Self {
        TriggerCondition::When(Box::new(predicate))
    }

    pub fn holds(&self, actor: &ActorId, world: &World) -> bool {
        match self {
            TriggerCondition::Manual => false,
            TriggerCondition::Region(rect) => world
                .actors()
                .position(actor)
                .is_some_and(|position| rect.contains(position)),
            TriggerCondition::When(predicate) => predicate(world),
        }
    }
}

impl fmt::Debug for TriggerCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerCondition::Manual => f.write_str("Manual"),
            TriggerCondition::Region(rect) => f.debug_tuple("Region").field(rect).finish(),
            TriggerCondition::When(_) => f.write_str("When(..)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionOutcome {
    Completed,
    Skipped,
    /// The registry had no cutscene under the trigger's name.
    Missing,
    Aborted,
    TornDown,
}

impl CompletionOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionOutcome::Completed => "completed",
            CompletionOutcome::Skipped => "skipped",
            CompletionOutcome::Missing => "missing",
            CompletionOutcome::Aborted => "aborted",
            CompletionOutcome::TornDown => "torn_down",
        }
    }
}

impl From<EndReason> for CompletionOutcome {
    fn from(reason: EndReason) -> Self {
        match reason {
            EndReason::Completed => CompletionOutcome::Completed,
            EndReason::Skipped => CompletionOutcome::Skipped,
            EndReason::TornDown => CompletionOutcome::TornDown,
            EndReason::Aborted => CompletionOutcome::Aborted,
        }
    }
}

/// Handed to the completion callback once a trigger has finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub trigger: TriggerId,
    pub cutscene: String,
    pub actor: ActorId,
    pub outcome: CompletionOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    /// A director is now running.
    Started,
    /// The run ended inside `fire` (missing content, an instant cutscene, or
    /// an actor that could not be locked).
    Finished(Completion),
    /// A director this trigger owns is still running.
    Busy,
    /// The trigger already finished and left the world.
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerState {
    Armed,
    Running,
    Removed,
}

type CompletionCallback = Box<dyn FnMut(&mut World, &Completion)>;

/// Starts one named cutscene for one actor and cleans up after it.
///
/// While its director runs the trigger refuses to start another. Once the
/// run ends, however it ends, the actor is unlocked, the completion callback
/// runs, and the trigger is removed. A name missing from the registry takes
/// the same path.
pub struct Trigger {
    id: TriggerId,
    cutscene: String,
    actor: ActorId,
    condition: TriggerCondition,
    on_complete: Option<CompletionCallback>,
    director: Option<Director>,
    state: TriggerState,
    locked: bool,
}

impl Trigger {
    pub fn new(cutscene: impl Into<String>, actor: impl Into<ActorId>) -> Self {
        Self {
            id: TriggerId(0),
            cutscene: cutscene.into(),
            actor: actor.into(),
            condition: TriggerCondition::Manual,
            on_complete: None,
            director: None,
            state: TriggerState::Armed,
            locked: false,
        }
    }

    pub fn with_condition(mut self, condition: TriggerCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn on_complete(mut self, callback: impl FnMut(&mut World, &Completion) + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn id(&self) -> TriggerId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: TriggerId) {
        self.id = id;
    }

    pub fn cutscene(&self) -> &str {
        &self.cutscene
    }

    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    pub fn condition(&self) -> &TriggerCondition {
        &self.condition
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == TriggerState::Armed
    }

    pub fn is_running(&self) -> bool {
        self.state == TriggerState::Running
    }

    pub fn is_removed(&self) -> bool {
        self.state == TriggerState::Removed
    }

    pub fn director(&self) -> Option<&Director> {
        self.director.as_ref()
    }

    pub fn fire(
        &mut self,
        world: &mut World,
        registry: &CutsceneRegistry,
        sequencer: &Sequencer,
    ) -> FireOutcome {
        let policy = sequencer.config().violations;
        match self.state {
            TriggerState::Armed => {}
            TriggerState::Running => {
                log::debug!("trigger {} for '{}' is busy", self.id, self.cutscene);
                return FireOutcome::Busy;
            }
            TriggerState::Removed => {
                let violation = InvariantViolation::TriggerRemoved(self.cutscene.clone());
                escalate(policy, world, "trigger", violation.into());
                return FireOutcome::Removed;
            }
        }

        self.state = TriggerState::Running;
        world.log_event(format!(
            "trigger.fire {} {} by {}",
            self.id, self.cutscene, self.actor
        ));
        match world.actors_mut().lock(&self.actor) {
            Ok(()) => {
                self.locked = true;
                world.log_event(format!("actor.lock {}", self.actor));
            }
            Err(err) => {
                escalate(policy, world, &self.cutscene, err.into());
                return FireOutcome::Finished(self.finish(world, CompletionOutcome::Aborted));
            }
        }

        let cutscene = match registry.create(&self.cutscene) {
            Ok(cutscene) => cutscene,
            Err(err) => {
                escalate(policy, world, "registry", err.into());
                return FireOutcome::Finished(self.finish(world, CompletionOutcome::Missing));
            }
        };
        let mut director = Director::new(cutscene, policy);
        director.begin(world, sequencer);
        self.director = Some(director);

        match self.poll(world) {
            Some(completion) => FireOutcome::Finished(completion),
            None => FireOutcome::Started,
        }
    }

    /// Advances the running director. Returns the completion when the run
    /// ended during this update.
    pub fn update(
        &mut self,
        world: &mut World,
        sequencer: &Sequencer,
        elapsed: f32,
    ) -> Option<Completion> {
        self.director.as_mut()?.update(world, sequencer, elapsed);
        self.poll(world)
    }

    pub fn request_skip(&mut self, world: &mut World) -> Option<Completion> {
        if !self.director.as_mut()?.request_skip(world) {
            return None;
        }
        self.poll(world)
    }

    /// Ends a running director as torn down. An armed trigger is simply
    /// removed without calling back.
    pub fn teardown(&mut self, world: &mut World) -> Option<Completion> {
        match self.director.as_mut() {
            Some(director) => {
                director.teardown(world);
                self.poll(world)
            }
            None => {
                if self.state == TriggerState::Armed {
                    self.state = TriggerState::Removed;
                    world.log_event(format!("trigger.remove {} {}", self.id, self.cutscene));
                }
                None
            }
        }
    }

    fn poll(&mut self, world: &mut World) -> Option<Completion> {
        let reason = self.director.as_ref()?.end_reason()?;
        self.director = None;
        Some(self.finish(world, reason.into()))
    }

    fn finish(&mut self, world: &mut World, outcome: CompletionOutcome) -> Completion {
        if std::mem::take(&mut self.locked) {
            match world.actors_mut().unlock(&self.actor) {
                Ok(()) => world.log_event(format!("actor.unlock {}", self.actor)),
                Err(err) => escalate(ViolationPolicy::Log, world, &self.cutscene, err.into()),
            }
        }

        let completion = Completion {
            trigger: self.id,
            cutscene: self.cutscene.clone(),
            actor: self.actor.clone(),
            outcome,
        };
        if let Some(mut callback) = self.on_complete.take() {
            callback(world, &completion);
        }
        self.state = TriggerState::Removed;
        world.log_event(format!(
            "trigger.complete {} {} ({})",
            self.id,
            self.cutscene,
            outcome.as_str()
        ));
        completion
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("id", &self.id)
            .field("cutscene", &self.cutscene)
            .field("actor", &self.actor)
            .field("condition", &self.condition)
            .field("state", &self.state)
            .field("director", &self.director)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::config::EngineConfig;
    use crate::script::Sequence;
    use crate::types::Vec2;
    use crate::world::StageActors;

    fn world() -> World {
        let mut actors = StageActors::new();
        actors.insert("player", Vec2::new(0.0, 0.0));
        World::in_memory().with_actors(actors)
    }

    fn sequencer(violations: ViolationPolicy) -> Sequencer {
        Sequencer::new(EngineConfig {
            violations,
            ..EngineConfig::default()
        })
    }

    fn greet_registry() -> CutsceneRegistry {
        let mut registry = CutsceneRegistry::new();
        registry.register("greet", || {
            Sequence::new("greet")
                .wait_seconds(0.5)
                .set_flag("greeted")
                .build()
        });
        registry
    }

    fn recorded() -> (Rc<RefCell<Vec<Completion>>>, impl FnMut(&mut World, &Completion)) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |_: &mut World, completion: &Completion| {
            sink.borrow_mut().push(completion.clone())
        })
    }

    #[test]
    fn registry_miss_unlocks_and_removes() {
        let mut world = world();
        let registry = CutsceneRegistry::new();
        let sequencer = sequencer(ViolationPolicy::Panic);
        let (seen, callback) = recorded();
        let mut trigger = Trigger::new("nonexistent", "player").on_complete(callback);

        let outcome = trigger.fire(&mut world, &registry, &sequencer);

        assert!(matches!(
            outcome,
            FireOutcome::Finished(Completion {
                outcome: CompletionOutcome::Missing,
                ..
            })
        ));
        assert!(trigger.is_removed());
        assert!(!world.actors().is_locked(&ActorId::from("player")));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn second_fire_while_running_is_refused() {
        let mut world = world();
        let registry = greet_registry();
        let sequencer = sequencer(ViolationPolicy::Panic);
        let mut trigger = Trigger::new("greet", "player");

        assert_eq!(trigger.fire(&mut world, &registry, &sequencer), FireOutcome::Started);
        assert_eq!(trigger.fire(&mut world, &registry, &sequencer), FireOutcome::Busy);

        let begins = world
            .events()
            .iter()
            .filter(|event| event.starts_with("director.begin"))
            .count();
        assert_eq!(begins, 1);
        assert!(trigger.director().is_some());
    }

    #[test]
    fn completion_calls_back_once_and_unlocks() {
        let mut world = world();
        let registry = greet_registry();
        let sequencer = sequencer(ViolationPolicy::Panic);
        let (seen, callback) = recorded();
        let mut trigger = Trigger::new("greet", "player").on_complete(callback);
        trigger.fire(&mut world, &registry, &sequencer);
        assert!(world.actors().is_locked(&ActorId::from("player")));

        let mut completion = None;
        for _ in 0..10 {
            completion = trigger.update(&mut world, &sequencer, 0.1);
            if completion.is_some() {
                break;
            }
        }

        let completion = completion.expect("greet finishes within a second");
        assert_eq!(completion.outcome, CompletionOutcome::Completed);
        assert!(world.flags().get_flag("greeted"));
        assert!(!world.actors().is_locked(&ActorId::from("player")));
        assert!(trigger.is_removed());
        assert_eq!(trigger.update(&mut world, &sequencer, 0.1), None);
        assert_eq!(seen.borrow().as_slice(), &[completion]);
    }

    #[test]
    fn skip_right_after_fire_still_greets() {
        let mut world = world();
        let registry = greet_registry();
        let sequencer = sequencer(ViolationPolicy::Panic);
        let mut trigger = Trigger::new("greet", "player");
        trigger.fire(&mut world, &registry, &sequencer);

        let completion = trigger.request_skip(&mut world).expect("running");

        assert_eq!(completion.outcome, CompletionOutcome::Skipped);
        assert!(world.flags().get_flag("greeted"));
        assert!(!world.actors().is_locked(&ActorId::from("player")));
    }

    #[test]
    fn firing_a_removed_trigger_is_logged_when_lenient() {
        let mut world = world();
        let registry = CutsceneRegistry::new();
        let sequencer = sequencer(ViolationPolicy::Log);
        let mut trigger = Trigger::new("nonexistent", "player");
        trigger.fire(&mut world, &registry, &sequencer);

        assert_eq!(
            trigger.fire(&mut world, &registry, &sequencer),
            FireOutcome::Removed
        );
        assert!(world
            .events()
            .iter()
            .any(|event| event.starts_with("error.invariant trigger:")));
    }

    #[test]
    fn missing_actor_is_aborted_without_a_director() {
        let mut world = World::in_memory();
        let registry = greet_registry();
        let sequencer = sequencer(ViolationPolicy::Panic);
        let mut trigger = Trigger::new("greet", "nobody");

        let outcome = trigger.fire(&mut world, &registry, &sequencer);

        assert!(matches!(
            outcome,
            FireOutcome::Finished(Completion {
                outcome: CompletionOutcome::Aborted,
                ..
            })
        ));
        assert!(!world.flags().get_flag("greeted"));
    }

    #[test]
    fn region_condition_follows_the_actor() {
        let mut world = world();
        let condition = TriggerCondition::Region(Rect::new(
            Vec2::new(2.0, -1.0),
            Vec2::new(4.0, 1.0),
        ));
        let player = ActorId::from("player");
        assert!(!condition.holds(&player, &world));

        world
            .actors_mut()
            .set_position(&player, Vec2::new(3.0, 0.0))
            .unwrap();
        assert!(condition.holds(&player, &world));
        assert!(!TriggerCondition::Manual.holds(&player, &world));
    }
}
