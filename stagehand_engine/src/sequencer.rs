use serde::Serialize;

use crate::config::{EngineConfig, ViolationPolicy};
use crate::error::{escalate, InvariantViolation};
use crate::script::ScriptContext;
use crate::task::{Instruction, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
    Pending,
    Complete,
}

enum Resumed {
    Yielded,
    Finished,
    Deferred,
}

/// Advances tasks by one logical step per tick.
///
/// An instruction yielded during the current tick is only passed if it is
/// already satisfied with zero elapsed time, so chains of finished nested
/// tasks unwind within a single tick while a `WaitFrame` always costs one.
/// The first step of a task only starts it: the tick's elapsed time goes to
/// nothing, and its first wait starts counting on the next step.
#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    config: EngineConfig,
}

impl Sequencer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn step(&self, task: &mut Task, elapsed: f32, cx: &mut ScriptContext<'_>) -> Progress {
        if !task.is_active() {
            self.reject_inactive(task, cx);
            return Progress::Complete;
        }
        let mut resumes = 0;
        self.drive(task, elapsed, cx, &mut resumes)
    }

    /// Steps `task` with a fixed tick until it completes. Returns the number
    /// of ticks taken, or `None` if it was still pending after `max_ticks`.
    pub fn drain(
        &self,
        task: &mut Task,
        elapsed: f32,
        cx: &mut ScriptContext<'_>,
        max_ticks: u32,
    ) -> Option<u32> {
        for tick in 1..=max_ticks {
            if self.step(task, elapsed, cx) == Progress::Complete {
                return Some(tick);
            }
        }
        None
    }

    fn drive(
        &self,
        task: &mut Task,
        elapsed: f32,
        cx: &mut ScriptContext<'_>,
        resumes: &mut u32,
    ) -> Progress {
        if task.is_canceled() {
            task.finish();
            cx.log_event(format!("task.cancel {}", task.label()));
            return Progress::Complete;
        }

        // `carried` is true while the live instruction was yielded on an
        // earlier tick; only then does this tick's elapsed time count.
        let mut carried = true;
        let mut budget = elapsed;
        if !task.is_started() {
            match self.resume(task, cx, resumes) {
                Resumed::Yielded => {}
                Resumed::Finished => return Progress::Complete,
                Resumed::Deferred => return Progress::Pending,
            }
            carried = false;
            budget = 0.0;
        }

        loop {
            let satisfied = match task.instruction_mut() {
                None => None,
                Some(Instruction::WaitFrame) => Some(carried),
                Some(Instruction::WaitSeconds {
                    duration,
                    accumulated,
                }) => {
                    *accumulated += budget;
                    Some(*accumulated >= *duration)
                }
                Some(Instruction::WaitTask(child)) => Some(
                    !child.is_active()
                        || self.drive(child, budget, cx, resumes) == Progress::Complete,
                ),
                Some(Instruction::WaitPredicate(predicate)) => Some(predicate(cx.world())),
            };
            match satisfied {
                None => {
                    task.finish();
                    return Progress::Complete;
                }
                Some(false) => return Progress::Pending,
                Some(true) => {}
            }
            match self.resume(task, cx, resumes) {
                Resumed::Yielded => {}
                Resumed::Finished => return Progress::Complete,
                Resumed::Deferred => return Progress::Pending,
            }
            carried = false;
            budget = 0.0;
        }
    }

    fn resume(&self, task: &mut Task, cx: &mut ScriptContext<'_>, resumes: &mut u32) -> Resumed {
        if *resumes >= self.config.max_resumes_per_step {
            log::warn!(
                "task '{}' reached {} resumes in one step; deferring to the next tick",
                task.label(),
                self.config.max_resumes_per_step
            );
            return Resumed::Deferred;
        }
        *resumes += 1;
        task.mark_started();
        match task.script_mut().resume(cx) {
            Some(instruction) => {
                task.set_instruction(instruction);
                Resumed::Yielded
            }
            None => {
                task.finish();
                Resumed::Finished
            }
        }
    }

    fn reject_inactive(&self, task: &mut Task, cx: &mut ScriptContext<'_>) {
        let violation = InvariantViolation::InactiveTask(task.label().to_string());
        match self.config.violations {
            ViolationPolicy::Panic => panic!("{violation}"),
            ViolationPolicy::Log => {
                if task.note_violation() {
                    let owner = cx.owner().to_string();
                    escalate(ViolationPolicy::Log, cx.world_mut(), &owner, violation.into());
                }
            }
        }
    }
}
