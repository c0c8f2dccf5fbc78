use std::cell::Cell;
use std::rc::Rc;

use crate::branch::{BranchTable, DialogueRun};
use crate::config::ViolationPolicy;
use crate::error::{escalate, EngineError};
use crate::finale::{FinalEffect, Finale};
use crate::registry::Cutscene;
use crate::resources::{Resource, ResourceId, ResourceSet};
use crate::task::{Instruction, Task};
use crate::types::{ActorId, EffectHandle, EntityId, Facing, SoundHandle, Vec2};
use crate::world::{Effects, World};

/// A resumable computation. Each call runs user code up to the next
/// suspension point; `None` means the computation is exhausted.
pub trait Script {
    fn resume(&mut self, cx: &mut ScriptContext<'_>) -> Option<Instruction>;
}

impl<F> Script for F
where
    F: FnMut(&mut ScriptContext<'_>) -> Option<Instruction>,
{
    fn resume(&mut self, cx: &mut ScriptContext<'_>) -> Option<Instruction> {
        self(cx)
    }
}

/// Shared between branches that hand a helper to each other. Empty until the
/// creating branch has run, so consumers must tolerate `None`.
pub type HelperSlot = Rc<Cell<Option<EntityId>>>;

/// Everything script code can reach while it runs.
pub struct ScriptContext<'a> {
    owner: &'a str,
    world: &'a mut World,
    resources: &'a mut ResourceSet,
    finale: &'a mut Finale,
    policy: ViolationPolicy,
}

impl<'a> ScriptContext<'a> {
    pub fn new(
        owner: &'a str,
        world: &'a mut World,
        resources: &'a mut ResourceSet,
        finale: &'a mut Finale,
        policy: ViolationPolicy,
    ) -> Self {
        Self {
            owner,
            world,
            resources,
            finale,
            policy,
        }
    }

    pub fn owner(&self) -> &str {
        self.owner
    }

    pub fn world(&self) -> &World {
        self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.world
    }

    pub fn policy(&self) -> ViolationPolicy {
        self.policy
    }

    pub fn resources(&self) -> &ResourceSet {
        self.resources
    }

    pub fn log_event(&mut self, event: impl Into<String>) {
        self.world.log_event(event);
    }

    pub fn report(&mut self, err: impl Into<EngineError>) {
        escalate(self.policy, self.world, self.owner, err.into());
    }

    /// Hands a resource to the owning director, which releases it at the end
    /// of the run unless the script releases it first.
    pub fn hold(&mut self, resource: Resource) -> ResourceId {
        self.resources.hold(resource)
    }

    pub fn release(&mut self, id: ResourceId) {
        if let Err(err) = self.resources.release(id, self.world) {
            self.report(err);
        }
    }

    /// Drops a resource the script already disposed of without releasing it
    /// again.
    pub fn forget(&mut self, id: ResourceId) {
        self.resources.forget(id);
    }

    pub fn spawn_helper(&mut self, kind: &str, at: Vec2) -> Option<EntityId> {
        match self.world.entities_mut().spawn(kind, at) {
            Ok(id) => {
                self.resources.hold(Resource::Helper(id));
                self.world.log_event(format!("helper.spawn {kind} #{id}"));
                Some(id)
            }
            Err(err) => {
                self.report(err);
                None
            }
        }
    }

    pub fn despawn_helper(&mut self, id: EntityId) {
        match self.resources.find(&Resource::Helper(id)) {
            Some(resource) => self.release(resource),
            None => self.world.log_event(format!("helper.despawn #{id} (not owned)")),
        }
    }

    /// Puts an extra actor into cutscene mode until the end of the run.
    pub fn lock_actor(&mut self, actor: &ActorId) -> bool {
        match self.world.actors_mut().lock(actor) {
            Ok(()) => {
                self.resources.hold(Resource::Lock(actor.clone()));
                self.world.log_event(format!("actor.lock {actor}"));
                true
            }
            Err(err) => {
                self.report(err);
                false
            }
        }
    }

    pub fn play_sound(&mut self, cue: &str) -> SoundHandle {
        let handle = self.world.effects_mut().play_sound(cue);
        self.resources.hold(Resource::Sound(handle));
        handle
    }

    pub fn start_effect(
        &mut self,
        cue: impl FnOnce(&mut dyn Effects) -> EffectHandle,
    ) -> EffectHandle {
        let handle = cue(self.world.effects_mut());
        self.resources.hold(Resource::Effect(handle));
        handle
    }

    /// Applies a load-bearing effect right now without declaring it.
    pub fn apply(&mut self, effect: &FinalEffect) {
        if let Err(err) = effect.apply(self.world) {
            self.report(err);
        }
    }

    pub(crate) fn apply_declared(&mut self, slot: usize) {
        if let Err(err) = self.finale.apply_slot(slot, self.world) {
            self.report(err);
        }
    }
}

type Action = Box<dyn FnMut(&mut ScriptContext<'_>)>;
type Suspend = Box<dyn FnMut(&mut ScriptContext<'_>) -> Option<Instruction>>;

enum Step {
    Run(Action),
    Suspend(Suspend),
    Effect {
        effect: FinalEffect,
        slot: Option<usize>,
    },
}

/// Straight-line script builder.
///
/// Load-bearing steps (`set_flag`, `increment_counter`, `place`, `face`,
/// `despawn`, `finally`) are also declared in the cutscene's finale when the
/// sequence is built with [`Sequence::build`], so a skipped run still
/// produces them. Sequences turned into plain tasks with
/// [`Sequence::into_task`] only produce them when they actually run.
pub struct Sequence {
    label: String,
    steps: Vec<Step>,
    finale: Finale,
    actors: Vec<ActorId>,
}

impl Sequence {
    pub fn new(label: impl Into<String>) -> Self {
        Sequence {
            label: label.into(),
            steps: Vec::new(),
            finale: Finale::new(),
            actors: Vec::new(),
        }
    }

    /// An actor held in cutscene mode for the whole run.
    pub fn controls(mut self, actor: impl Into<ActorId>) -> Self {
        self.actors.push(actor.into());
        self
    }

    pub fn then(mut self, action: impl FnMut(&mut ScriptContext<'_>) + 'static) -> Self {
        self.steps.push(Step::Run(Box::new(action)));
        self
    }

    /// Runs `suspend` and yields what it returns; `None` continues straight on.
    pub fn suspend(
        mut self,
        suspend: impl FnMut(&mut ScriptContext<'_>) -> Option<Instruction> + 'static,
    ) -> Self {
        self.steps.push(Step::Suspend(Box::new(suspend)));
        self
    }

    pub fn wait_frame(self) -> Self {
        self.suspend(|_| Some(Instruction::WaitFrame))
    }

    pub fn wait_frames(self, frames: u32) -> Self {
        (0..frames).fold(self, |sequence, _| sequence.wait_frame())
    }

    pub fn wait_seconds(self, seconds: f32) -> Self {
        self.suspend(move |_| Some(Instruction::wait_seconds(seconds)))
    }

    pub fn wait_until(self, predicate: impl Fn(&World) -> bool + 'static) -> Self {
        let predicate: Rc<dyn Fn(&World) -> bool> = Rc::new(predicate);
        self.suspend(move |_| {
            let predicate = Rc::clone(&predicate);
            Some(Instruction::wait_until(move |world| predicate(world)))
        })
    }

    /// Awaits a nested task built when this step is reached.
    pub fn wait_for(
        self,
        mut make: impl FnMut(&mut ScriptContext<'_>) -> Task + 'static,
    ) -> Self {
        self.suspend(move |cx| Some(Instruction::wait_task(make(cx))))
    }

    /// Fire-and-forget camera or screen cue. Stopped at the end of the run.
    pub fn camera(
        self,
        mut cue: impl FnMut(&mut dyn Effects) -> EffectHandle + 'static,
    ) -> Self {
        self.then(move |cx| {
            cx.start_effect(&mut cue);
        })
    }

    /// Camera or screen cue that the script waits out.
    pub fn camera_and_wait(
        self,
        mut cue: impl FnMut(&mut dyn Effects) -> EffectHandle + 'static,
    ) -> Self {
        self.suspend(move |cx| {
            let handle = cx.start_effect(&mut cue);
            Some(Instruction::wait_until(move |world| {
                !world.effects().is_playing(handle)
            }))
        })
    }

    pub fn sound(self, cue: impl Into<String>) -> Self {
        let cue = cue.into();
        self.then(move |cx| {
            cx.play_sound(&cue);
        })
    }

    /// Plays dialogue `key`, running the table's branches at its milestones.
    pub fn dialogue(
        self,
        key: impl Into<String>,
        mut branches: impl FnMut() -> BranchTable + 'static,
    ) -> Self {
        let key = key.into();
        self.suspend(move |_| {
            let run = DialogueRun::new(key.clone(), branches());
            Some(Instruction::wait_task(Task::new(
                format!("dialogue {key}"),
                run,
            )))
        })
    }

    pub fn spawn_helper(self, kind: impl Into<String>, at: Vec2, slot: HelperSlot) -> Self {
        let kind = kind.into();
        self.then(move |cx| slot.set(cx.spawn_helper(&kind, at)))
    }

    /// Removes the helper in `slot`, if the branch that creates it ever ran.
    pub fn despawn_helper(self, slot: HelperSlot) -> Self {
        self.then(move |cx| match slot.take() {
            Some(id) => cx.despawn_helper(id),
            None => cx.log_event("helper.despawn skipped (never spawned)"),
        })
    }

    pub fn set_flag(self, name: impl Into<String>) -> Self {
        self.declare(FinalEffect::SetFlag(name.into()))
    }

    pub fn increment_counter(self, name: impl Into<String>) -> Self {
        self.declare(FinalEffect::IncrementCounter(name.into()))
    }

    pub fn place(self, actor: impl Into<ActorId>, position: Vec2) -> Self {
        self.declare(FinalEffect::Place {
            actor: actor.into(),
            position,
        })
    }

    pub fn face(self, actor: impl Into<ActorId>, facing: Facing) -> Self {
        self.declare(FinalEffect::Face {
            actor: actor.into(),
            facing,
        })
    }

    pub fn despawn(self, kind: impl Into<String>) -> Self {
        self.declare(FinalEffect::Despawn(kind.into()))
    }

    /// Declares an arbitrary load-bearing effect. The body runs once per
    /// run, either when reached or when the run ends without reaching it.
    pub fn finally(
        self,
        label: impl Into<String>,
        apply: impl Fn(&mut World) -> Result<(), EngineError> + 'static,
    ) -> Self {
        self.declare(FinalEffect::custom(label, apply))
    }

    fn declare(mut self, effect: FinalEffect) -> Self {
        let slot = self.finale.declare(effect.clone());
        self.steps.push(Step::Effect {
            effect,
            slot: Some(slot),
        });
        self
    }

    pub fn build(self) -> Cutscene {
        let root = Task::new(
            self.label.clone(),
            SequenceRun {
                steps: self.steps,
                cursor: 0,
            },
        );
        let mut cutscene = Cutscene::new(self.label, root).with_finale(self.finale);
        for actor in self.actors {
            cutscene = cutscene.with_actor(actor);
        }
        cutscene
    }

    pub fn into_task(self) -> Task {
        let steps = self
            .steps
            .into_iter()
            .map(|step| match step {
                Step::Effect { effect, .. } => Step::Effect { effect, slot: None },
                other => other,
            })
            .collect();
        Task::new(self.label, SequenceRun { steps, cursor: 0 })
    }
}

struct SequenceRun {
    steps: Vec<Step>,
    cursor: usize,
}

impl Script for SequenceRun {
    fn resume(&mut self, cx: &mut ScriptContext<'_>) -> Option<Instruction> {
        while let Some(step) = self.steps.get_mut(self.cursor) {
            self.cursor += 1;
            match step {
                Step::Run(action) => action(cx),
                Step::Suspend(suspend) => {
                    if let Some(instruction) = suspend(cx) {
                        return Some(instruction);
                    }
                }
                Step::Effect {
                    slot: Some(slot), ..
                } => cx.apply_declared(*slot),
                Step::Effect { effect, slot: None } => cx.apply(effect),
            }
        }
        None
    }
}
