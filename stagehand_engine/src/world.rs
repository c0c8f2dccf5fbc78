mod actors;
mod dialogue;
mod effects;
mod entities;
mod flags;

pub use actors::{ActorControl, StageActors};
pub use dialogue::{DialogueBeat, DialogueEvent, DialoguePlayer, ScriptedDialogue};
pub use effects::{EffectEvent, Effects, RecordingEffects};
pub use entities::{EntityLookup, EntitySet};
pub use flags::{FlagSnapshot, FlagStore, MemoryFlags};

/// The host collaborators a script may touch, plus the engine event log.
///
/// The engine only ever talks to the traits; `in_memory` wires the reference
/// implementations so tests and the host binary can run without a game.
///
/// The event log is unbounded. Long-running hosts drain it with
/// [`take_events`](World::take_events) once per tick.
pub struct World {
    actors: Box<dyn ActorControl>,
    flags: Box<dyn FlagStore>,
    effects: Box<dyn Effects>,
    entities: Box<dyn EntityLookup>,
    dialogue: Box<dyn DialoguePlayer>,
    events: Vec<String>,
}

impl World {
    pub fn new(
        actors: Box<dyn ActorControl>,
        flags: Box<dyn FlagStore>,
        effects: Box<dyn Effects>,
        entities: Box<dyn EntityLookup>,
        dialogue: Box<dyn DialoguePlayer>,
    ) -> Self {
        World {
            actors,
            flags,
            effects,
            entities,
            dialogue,
            events: Vec::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Box::new(StageActors::new()),
            Box::new(MemoryFlags::new()),
            Box::new(RecordingEffects::new()),
            Box::new(EntitySet::new()),
            Box::new(ScriptedDialogue::new()),
        )
    }

    pub fn with_actors(mut self, actors: impl ActorControl + 'static) -> Self {
        self.actors = Box::new(actors);
        self
    }

    pub fn with_flags(mut self, flags: impl FlagStore + 'static) -> Self {
        self.flags = Box::new(flags);
        self
    }

    pub fn with_effects(mut self, effects: impl Effects + 'static) -> Self {
        self.effects = Box::new(effects);
        self
    }

    pub fn with_entities(mut self, entities: impl EntityLookup + 'static) -> Self {
        self.entities = Box::new(entities);
        self
    }

    pub fn with_dialogue(mut self, dialogue: impl DialoguePlayer + 'static) -> Self {
        self.dialogue = Box::new(dialogue);
        self
    }

    pub fn actors(&self) -> &dyn ActorControl {
        self.actors.as_ref()
    }

    pub fn actors_mut(&mut self) -> &mut dyn ActorControl {
        self.actors.as_mut()
    }

    pub fn flags(&self) -> &dyn FlagStore {
        self.flags.as_ref()
    }

    pub fn flags_mut(&mut self) -> &mut dyn FlagStore {
        self.flags.as_mut()
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    pub fn effects_mut(&mut self) -> &mut dyn Effects {
        self.effects.as_mut()
    }

    pub fn entities(&self) -> &dyn EntityLookup {
        self.entities.as_ref()
    }

    pub fn entities_mut(&mut self) -> &mut dyn EntityLookup {
        self.entities.as_mut()
    }

    pub fn dialogue(&self) -> &dyn DialoguePlayer {
        self.dialogue.as_ref()
    }

    pub fn dialogue_mut(&mut self) -> &mut dyn DialoguePlayer {
        self.dialogue.as_mut()
    }

    /// Lets time-based collaborators observe the tick.
    pub fn advance(&mut self, elapsed: f32) {
        self.effects.advance(elapsed);
    }

    pub fn log_event(&mut self, event: impl Into<String>) {
        let event = event.into();
        log::debug!("{event}");
        self.events.push(event);
    }

    pub fn events(&self) -> &[String] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<String> {
        std::mem::take(&mut self.events)
    }
}
