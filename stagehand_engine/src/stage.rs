use crate::config::EngineConfig;
use crate::registry::CutsceneRegistry;
use crate::sequencer::Sequencer;
use crate::trigger::{Completion, FireOutcome, Trigger, TriggerState};
use crate::types::TriggerId;
use crate::world::World;

/// Engine state for one loaded scene: the world, the cutscene library and
/// the triggers placed in it.
pub struct Stage {
    world: World,
    registry: CutsceneRegistry,
    sequencer: Sequencer,
    triggers: Vec<Trigger>,
    next_trigger: u32,
    completions: Vec<Completion>,
}

impl Stage {
    pub fn new(world: World, config: EngineConfig) -> Self {
        Self {
            world,
            registry: CutsceneRegistry::new(),
            sequencer: Sequencer::new(config),
            triggers: Vec::new(),
            next_trigger: 0,
            completions: Vec::new(),
        }
    }

    pub fn with_registry(mut self, registry: CutsceneRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn registry(&self) -> &CutsceneRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CutsceneRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        self.sequencer.config()
    }

    pub fn place(&mut self, mut trigger: Trigger) -> TriggerId {
        self.next_trigger += 1;
        let id = TriggerId(self.next_trigger);
        trigger.set_id(id);
        self.world.log_event(format!(
            "trigger.place {id} {} for {}",
            trigger.cutscene(),
            trigger.actor()
        ));
        self.triggers.push(trigger);
        id
    }

    pub fn trigger(&self, id: TriggerId) -> Option<&Trigger> {
        self.triggers.iter().find(|trigger| trigger.id() == id)
    }

    pub fn triggers(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter()
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    pub fn running(&self) -> usize {
        self.triggers
            .iter()
            .filter(|trigger| trigger.is_running())
            .count()
    }

    pub fn fire(&mut self, id: TriggerId) -> FireOutcome {
        let Some(trigger) = self.triggers.iter_mut().find(|trigger| trigger.id() == id) else {
            log::warn!("fire of trigger {id} ignored: not on this stage");
            return FireOutcome::Removed;
        };
        let outcome = trigger.fire(&mut self.world, &self.registry, &self.sequencer);
        if let FireOutcome::Finished(completion) = &outcome {
            self.completions.push(completion.clone());
        }
        self.prune();
        outcome
    }

    /// Advances the world by `elapsed`, then makes two passes over the
    /// triggers in placement order. The first updates running triggers. The
    /// second fires armed triggers whose condition now holds, so a cutscene
    /// that ended in the first pass can enable another in the same tick. A
    /// trigger fired during this tick is first updated on the next one.
    pub fn tick(&mut self, elapsed: f32) -> Vec<Completion> {
        self.world.advance(elapsed);

        let mut finished = Vec::new();
        for trigger in &mut self.triggers {
            if trigger.state() == TriggerState::Running {
                finished.extend(trigger.update(&mut self.world, &self.sequencer, elapsed));
            }
        }

        // Armed triggers see the effects of every cutscene that ended above.
        for trigger in &mut self.triggers {
            if trigger.state() != TriggerState::Armed
                || !trigger.condition().holds(trigger.actor(), &self.world)
            {
                continue;
            }
            let outcome = trigger.fire(&mut self.world, &self.registry, &self.sequencer);
            if let FireOutcome::Finished(completion) = outcome {
                finished.push(completion);
            }
        }

        self.prune();
        self.completions.extend(finished.iter().cloned());
        finished
    }

    pub fn request_skip(&mut self, id: TriggerId) -> bool {
        let Some(trigger) = self.triggers.iter_mut().find(|trigger| trigger.id() == id) else {
            return false;
        };
        let Some(completion) = trigger.request_skip(&mut self.world) else {
            return false;
        };
        self.completions.push(completion);
        self.prune();
        true
    }

    /// Skips every running cutscene. Returns how many were skipped.
    pub fn skip_all(&mut self) -> usize {
        let mut skipped = 0;
        for trigger in &mut self.triggers {
            if let Some(completion) = trigger.request_skip(&mut self.world) {
                self.completions.push(completion);
                skipped += 1;
            }
        }
        self.prune();
        skipped
    }

    /// Tears down every running director and removes every trigger, then
    /// forgets the cutscene library.
    pub fn unload(&mut self) -> Vec<Completion> {
        let mut finished = Vec::new();
        for trigger in &mut self.triggers {
            finished.extend(trigger.teardown(&mut self.world));
        }
        self.prune();
        self.registry.clear();
        self.world.log_event("stage.unload");
        self.completions.extend(finished.iter().cloned());
        finished
    }

    /// Every completion since the last [`take_completions`](Stage::take_completions).
    /// Hosts that run many scenes on one stage should drain it.
    pub fn completions(&self) -> &[Completion] {
        &self.completions
    }

    pub fn take_completions(&mut self) -> Vec<Completion> {
        std::mem::take(&mut self.completions)
    }

    fn prune(&mut self) {
        self.triggers.retain(|trigger| !trigger.is_removed());
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        if self.running() > 0 {
            log::warn!("stage dropped with {} running cutscene(s); unloading", self.running());
            self.unload();
        }
    }
}
