//! Narrative sequencing engine shared by the stagehand tools.
//!
//! Cutscene scripts run as cooperative tasks that yield [`Instruction`]s to a
//! [`Sequencer`]. A [`Director`] owns one script's begin/run/end lifecycle and
//! guarantees that skipping a script leaves the world in the same load-bearing
//! state as letting it finish. [`Trigger`]s bind directors to the world, and
//! a [`Stage`] owns everything that belongs to one loaded scene.

pub mod branch;
pub mod config;
pub mod director;
pub mod error;
pub mod finale;
pub mod registry;
pub mod resources;
pub mod script;
pub mod sequencer;
pub mod stage;
pub mod task;
pub mod trigger;
pub mod types;
pub mod world;

pub use branch::{BranchFire, BranchTable, DialogueRun};
pub use config::{EngineConfig, ViolationPolicy};
pub use director::{Director, DirectorState, EndReason};
pub use error::{ContentError, EngineError, InvariantViolation, Unavailable};
pub use finale::{FinalEffect, Finale};
pub use registry::{Cutscene, CutsceneRegistry};
pub use resources::{Resource, ResourceId, ResourceSet};
pub use script::{HelperSlot, Script, ScriptContext, Sequence};
pub use sequencer::{Progress, Sequencer};
pub use stage::Stage;
pub use task::{Instruction, Task};
pub use trigger::{
    Completion, CompletionOutcome, FireOutcome, Trigger, TriggerCondition, TriggerState,
};
pub use types::{
    ActorId, DialogueHandle, EffectHandle, EntityId, Facing, Rect, SoundHandle, TriggerId, Vec2,
};
pub use world::{
    ActorControl, DialogueBeat, DialogueEvent, DialoguePlayer, EffectEvent, Effects,
    EntityLookup, EntitySet, FlagSnapshot, FlagStore, MemoryFlags, RecordingEffects,
    ScriptedDialogue, StageActors, World,
};
