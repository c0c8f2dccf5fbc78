use thiserror::Error;

use crate::config::ViolationPolicy;
use crate::types::{ActorId, EntityId};
use crate::world::World;

/// Authoring mistakes: recoverable, logged, and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    #[error("no cutscene registered under '{0}'")]
    UnknownCutscene(String),
    #[error("branch index {index} is outside a table of {len} entries")]
    UnknownBranch { index: usize, len: usize },
    #[error("no dialogue registered under '{0}'")]
    UnknownDialogue(String),
}

/// Engine misuse. Fatal under [`ViolationPolicy::Panic`], logged otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("task '{0}' stepped after it became inactive")]
    InactiveTask(String),
    #[error("branch {requested} fired after branch {last}")]
    BranchOutOfOrder { requested: usize, last: usize },
    #[error("branch {requested} fired before branch {expected}")]
    BranchSkipped { requested: usize, expected: usize },
    #[error("director '{name}' cannot {operation} while {state}")]
    DirectorState {
        name: String,
        operation: &'static str,
        state: &'static str,
    },
    #[error("trigger for '{0}' was used after it left the world")]
    TriggerRemoved(String),
}

/// A collaborator could not serve the request (missing actor, missing entity,
/// failed lookup). Always a soft condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unavailable {
    #[error("actor '{0}' is not present")]
    Actor(ActorId),
    #[error("entity #{0} is not present")]
    Entity(EntityId),
    #[error("entity lookup failed: {0}")]
    Lookup(String),
    #[error("dialogue '{0}' could not be opened")]
    Dialogue(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
    #[error(transparent)]
    Unavailable(#[from] Unavailable),
}

impl EngineError {
    pub fn is_invariant(&self) -> bool {
        matches!(self, EngineError::Invariant(_))
    }

    fn label(&self) -> &'static str {
        match self {
            EngineError::Content(_) => "content",
            EngineError::Invariant(_) => "invariant",
            EngineError::Unavailable(_) => "unavailable",
        }
    }
}

/// Routes an engine error according to `policy`.
///
/// Invariant violations panic under [`ViolationPolicy::Panic`]; every other
/// combination is logged and recorded in the world's event log so the caller
/// can carry on with the offending operation skipped.
pub fn escalate(policy: ViolationPolicy, world: &mut World, context: &str, err: EngineError) {
    if err.is_invariant() && policy == ViolationPolicy::Panic {
        panic!("{context}: {err}");
    }
    match &err {
        EngineError::Invariant(_) => log::error!("{context}: {err}"),
        _ => log::warn!("{context}: {err}"),
    }
    world.log_event(format!("error.{} {context}: {err}", err.label()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_errors_are_recorded_under_either_policy() {
        let mut world = World::in_memory();
        escalate(
            ViolationPolicy::Panic,
            &mut world,
            "registry",
            ContentError::UnknownCutscene("ghost".to_string()).into(),
        );
        escalate(
            ViolationPolicy::Log,
            &mut world,
            "branch",
            InvariantViolation::BranchSkipped {
                requested: 1,
                expected: 0,
            }
            .into(),
        );
        assert_eq!(
            world.events(),
            &[
                "error.content registry: no cutscene registered under 'ghost'".to_string(),
                "error.invariant branch: branch 1 fired before branch 0".to_string(),
            ]
        );
    }

    #[test]
    #[should_panic(expected = "stepped after it became inactive")]
    fn violations_panic_under_strict_policy() {
        let mut world = World::in_memory();
        escalate(
            ViolationPolicy::Panic,
            &mut world,
            "sequencer",
            InvariantViolation::InactiveTask("root".to_string()).into(),
        );
    }
}
