use std::fmt;

use crate::error::{ContentError, EngineError, InvariantViolation};
use crate::resources::{Resource, ResourceId};
use crate::script::{Script, ScriptContext};
use crate::task::{Instruction, Task};
use crate::types::DialogueHandle;
use crate::world::DialogueEvent;

type BranchFactory = Box<dyn FnOnce() -> Task>;

struct Branch {
    label: String,
    make: Option<BranchFactory>,
}

/// Milestone-indexed sub-tasks for one dialogue.
///
/// Indices must be fired in sequence starting at zero. Each entry runs at
/// most once; firing the most recent index again is ignored so a player that
/// re-delivers a milestone is harmless.
#[derive(Default)]
pub struct BranchTable {
    branches: Vec<Branch>,
    last_fired: Option<usize>,
}

pub enum BranchFire {
    Run(Task),
    AlreadyFired,
}

impl BranchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn branch(mut self, label: impl Into<String>, make: impl FnOnce() -> Task + 'static) -> Self {
        self.branches.push(Branch {
            label: label.into(),
            make: Some(Box::new(make)),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn last_fired(&self) -> Option<usize> {
        self.last_fired
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.branches.get(index).map(|branch| branch.label.as_str())
    }

    pub fn fire(&mut self, index: usize) -> Result<BranchFire, EngineError> {
        let len = self.branches.len();
        if index >= len {
            return Err(ContentError::UnknownBranch { index, len }.into());
        }
        let expected = match self.last_fired {
            Some(last) if index == last => return Ok(BranchFire::AlreadyFired),
            Some(last) if index < last => {
                return Err(InvariantViolation::BranchOutOfOrder {
                    requested: index,
                    last,
                }
                .into())
            }
            Some(last) => last + 1,
            None => 0,
        };
        if index != expected {
            return Err(InvariantViolation::BranchSkipped {
                requested: index,
                expected,
            }
            .into());
        }

        self.last_fired = Some(index);
        match self.branches[index].make.take() {
            Some(make) => Ok(BranchFire::Run(make())),
            None => Ok(BranchFire::AlreadyFired),
        }
    }
}

impl fmt::Debug for BranchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BranchTable")
            .field(
                "branches",
                &self
                    .branches
                    .iter()
                    .map(|branch| branch.label.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("last_fired", &self.last_fired)
            .finish()
    }
}

enum Playback {
    Unopened,
    Open {
        handle: DialogueHandle,
        resource: ResourceId,
    },
    Finished,
}

/// Plays one dialogue and runs its branch table at the player's milestones.
/// Each fired branch is awaited before the player is polled again.
pub struct DialogueRun {
    key: String,
    branches: BranchTable,
    playback: Playback,
}

impl DialogueRun {
    pub fn new(key: impl Into<String>, branches: BranchTable) -> Self {
        Self {
            key: key.into(),
            branches,
            playback: Playback::Unopened,
        }
    }

    fn open(&mut self, cx: &mut ScriptContext<'_>) -> Option<(DialogueHandle, ResourceId)> {
        match cx.world_mut().dialogue_mut().open(&self.key) {
            Ok(handle) => {
                let resource = cx.hold(Resource::Dialogue(handle));
                cx.log_event(format!("dialogue.open {}", self.key));
                self.playback = Playback::Open { handle, resource };
                Some((handle, resource))
            }
            Err(err) => {
                cx.report(err);
                self.playback = Playback::Finished;
                None
            }
        }
    }
}

impl Script for DialogueRun {
    fn resume(&mut self, cx: &mut ScriptContext<'_>) -> Option<Instruction> {
        let (handle, resource) = match self.playback {
            Playback::Unopened => self.open(cx)?,
            Playback::Open { handle, resource } => (handle, resource),
            Playback::Finished => return None,
        };

        loop {
            match cx.world_mut().dialogue_mut().poll(handle) {
                DialogueEvent::Showing => return Some(Instruction::WaitFrame),
                DialogueEvent::Milestone(index) => match self.branches.fire(index) {
                    Ok(BranchFire::Run(task)) => {
                        let label = self.branches.label(index).unwrap_or_default();
                        cx.log_event(format!("branch.fire {} {index} {label}", self.key));
                        return Some(Instruction::wait_task(task));
                    }
                    Ok(BranchFire::AlreadyFired) => {
                        log::debug!("dialogue '{}' re-delivered milestone {index}", self.key);
                    }
                    Err(err) => cx.report(err),
                },
                DialogueEvent::Closed => {
                    cx.forget(resource);
                    cx.log_event(format!("dialogue.close {}", self.key));
                    self.playback = Playback::Finished;
                    return None;
                }
            }
        }
    }
}
