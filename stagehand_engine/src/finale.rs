use std::fmt;
use std::rc::Rc;

use crate::error::EngineError;
use crate::types::{ActorId, Facing, Vec2};
use crate::world::World;

type CustomEffect = Rc<dyn Fn(&mut World) -> Result<(), EngineError>>;

/// A side effect later gameplay depends on. Declared up front so a skipped
/// run can still produce it.
#[derive(Clone)]
pub enum FinalEffect {
    SetFlag(String),
    IncrementCounter(String),
    Place { actor: ActorId, position: Vec2 },
    Face { actor: ActorId, facing: Facing },
    /// Removes every entity carrying this kind tag.
    Despawn(String),
    Custom { label: String, apply: CustomEffect },
}

impl FinalEffect {
    pub fn custom(
        label: impl Into<String>,
        apply: impl Fn(&mut World) -> Result<(), EngineError> + 'static,
    ) -> Self {
        FinalEffect::Custom {
            label: label.into(),
            apply: Rc::new(apply),
        }
    }

    pub fn label(&self) -> String {
        match self {
            FinalEffect::SetFlag(name) => format!("flag.set {name}"),
            FinalEffect::IncrementCounter(name) => format!("counter.increment {name}"),
            FinalEffect::Place { actor, position } => format!("actor.place {actor} {position}"),
            FinalEffect::Face { actor, facing } => {
                format!("actor.face {actor} {}", facing.as_str())
            }
            FinalEffect::Despawn(kind) => format!("entity.despawn {kind}"),
            FinalEffect::Custom { label, .. } => format!("final.custom {label}"),
        }
    }

    /// Counters move every time they are applied and custom bodies are
    /// opaque, so both run at most once per cutscene. Everything else
    /// converges.
    pub fn is_idempotent(&self) -> bool {
        !matches!(
            self,
            FinalEffect::IncrementCounter(_) | FinalEffect::Custom { .. }
        )
    }

    pub(crate) fn apply(&self, world: &mut World) -> Result<(), EngineError> {
        match self {
            FinalEffect::SetFlag(name) => world.flags_mut().set_flag(name),
            FinalEffect::IncrementCounter(name) => {
                world.flags_mut().increment_counter(name);
            }
            FinalEffect::Place { actor, position } => {
                world.actors_mut().set_position(actor, *position)?
            }
            FinalEffect::Face { actor, facing } => world.actors_mut().set_facing(actor, *facing)?,
            FinalEffect::Despawn(kind) => {
                let ids = world.entities().find_by_kind(kind)?;
                for id in ids {
                    world.entities_mut().remove(id)?;
                }
            }
            FinalEffect::Custom { apply, .. } => apply(world)?,
        }
        world.log_event(self.label());
        Ok(())
    }
}

impl fmt::Debug for FinalEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// The load-bearing effects of one cutscene run and which of them the run
/// has already produced.
#[derive(Debug, Default, Clone)]
pub struct Finale {
    effects: Vec<FinalEffect>,
    applied: Vec<bool>,
}

impl Finale {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot the effect occupies.
    pub fn declare(&mut self, effect: FinalEffect) -> usize {
        self.effects.push(effect);
        self.applied.push(false);
        self.effects.len() - 1
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn effects(&self) -> &[FinalEffect] {
        &self.effects
    }

    pub fn was_applied(&self, slot: usize) -> bool {
        self.applied.get(slot).copied().unwrap_or(false)
    }

    pub(crate) fn apply_slot(&mut self, slot: usize, world: &mut World) -> Result<(), EngineError> {
        let Some(effect) = self.effects.get(slot) else {
            return Ok(());
        };
        effect.apply(world)?;
        self.applied[slot] = true;
        Ok(())
    }

    /// Produces every declared effect for the end of a run. Idempotent
    /// effects are re-applied unconditionally; the rest only if the run never
    /// reached them. Each effect fails on its own.
    pub(crate) fn settle(&mut self, world: &mut World) -> Vec<(String, EngineError)> {
        let mut failures = Vec::new();
        for (effect, applied) in self.effects.iter().zip(self.applied.iter_mut()) {
            if *applied && !effect.is_idempotent() {
                continue;
            }
            match effect.apply(world) {
                Ok(()) => *applied = true,
                Err(err) => failures.push((effect.label(), err)),
            }
        }
        failures
    }
}
