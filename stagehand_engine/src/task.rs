use std::fmt;

use crate::script::{Script, ScriptContext};
use crate::world::World;

pub type Predicate = Box<dyn Fn(&World) -> bool>;

/// Why a task is currently suspended.
pub enum Instruction {
    /// Resume on the next tick.
    WaitFrame,
    /// Resume once `duration` seconds of tick time have accumulated.
    WaitSeconds { duration: f32, accumulated: f32 },
    /// Resume once the child task has completed. The sequencer drives the child.
    WaitTask(Box<Task>),
    /// Resume once the predicate holds. Evaluated at most once per tick.
    WaitPredicate(Predicate),
}

impl Instruction {
    pub fn wait_seconds(duration: f32) -> Self {
        Instruction::WaitSeconds {
            duration,
            accumulated: 0.0,
        }
    }

    pub fn wait_task(task: Task) -> Self {
        Instruction::WaitTask(Box::new(task))
    }

    pub fn wait_until(predicate: impl Fn(&World) -> bool + 'static) -> Self {
        Instruction::WaitPredicate(Box::new(predicate))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::WaitFrame => "wait_frame",
            Instruction::WaitSeconds { .. } => "wait_seconds",
            Instruction::WaitTask(_) => "wait_task",
            Instruction::WaitPredicate(_) => "wait_predicate",
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::WaitFrame => f.write_str("WaitFrame"),
            Instruction::WaitSeconds {
                duration,
                accumulated,
            } => f
                .debug_struct("WaitSeconds")
                .field("duration", duration)
                .field("accumulated", accumulated)
                .finish(),
            Instruction::WaitTask(task) => f.debug_tuple("WaitTask").field(task).finish(),
            Instruction::WaitPredicate(_) => f.write_str("WaitPredicate(..)"),
        }
    }
}

/// A suspendable unit of script computation.
///
/// A task starts out active with no instruction; its first step runs the
/// script up to the first suspension point. Once inactive it holds no
/// instruction and must not be stepped again.
pub struct Task {
    label: String,
    script: Box<dyn Script>,
    instruction: Option<Instruction>,
    started: bool,
    active: bool,
    canceled: bool,
    violation_logged: bool,
}

impl Task {
    pub fn new(label: impl Into<String>, script: impl Script + 'static) -> Self {
        Task {
            label: label.into(),
            script: Box::new(script),
            instruction: None,
            started: false,
            active: true,
            canceled: false,
            violation_logged: false,
        }
    }

    pub fn from_fn<F>(label: impl Into<String>, resume: F) -> Self
    where
        F: FnMut(&mut ScriptContext<'_>) -> Option<Instruction> + 'static,
    {
        Task::new(label, resume)
    }

    /// A task whose whole body runs in its first step.
    pub fn once<F>(label: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(&mut ScriptContext<'_>) + 'static,
    {
        let mut body = Some(body);
        Task::from_fn(label, move |cx| {
            if let Some(body) = body.take() {
                body(cx);
            }
            None
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    pub fn instruction(&self) -> Option<&Instruction> {
        self.instruction.as_ref()
    }

    /// Marks the task canceled. The next step retires it without resuming the
    /// script; no cleanup runs on the task's behalf.
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    /// Number of nested tasks currently being awaited below this one.
    pub fn depth(&self) -> usize {
        match &self.instruction {
            Some(Instruction::WaitTask(child)) => 1 + child.depth(),
            _ => 0,
        }
    }

    pub(crate) fn script_mut(&mut self) -> &mut dyn Script {
        self.script.as_mut()
    }

    pub(crate) fn instruction_mut(&mut self) -> Option<&mut Instruction> {
        self.instruction.as_mut()
    }

    pub(crate) fn set_instruction(&mut self, instruction: Instruction) {
        self.instruction = Some(instruction);
    }

    pub(crate) fn mark_started(&mut self) {
        self.started = true;
    }

    /// Retires the task, dropping whatever it was waiting on.
    pub(crate) fn finish(&mut self) {
        self.active = false;
        self.instruction = None;
    }

    /// Returns true the first time it is called.
    pub(crate) fn note_violation(&mut self) -> bool {
        !std::mem::replace(&mut self.violation_logged, true)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("label", &self.label)
            .field("instruction", &self.instruction)
            .field("active", &self.active)
            .field("canceled", &self.canceled)
            .finish()
    }
}
