use std::collections::BTreeMap;

use crate::error::{ContentError, Unavailable};
use crate::types::DialogueHandle;

/// One scripted step of a dialogue box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueBeat {
    /// A page of text that stays up for `frames` polls.
    Page { frames: u32 },
    /// The point at which branch `index` of the caller's table must run.
    Milestone(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogueEvent {
    Showing,
    Milestone(usize),
    Closed,
}

/// Renders dialogue and reports milestones. Polled once per resume of the
/// task that awaits it.
pub trait DialoguePlayer {
    fn open(&mut self, key: &str) -> Result<DialogueHandle, Unavailable>;
    fn poll(&mut self, handle: DialogueHandle) -> DialogueEvent;
    /// Closes the box early. Returns false when it was already closed.
    fn close(&mut self, handle: DialogueHandle) -> bool;
    fn is_open(&self, handle: DialogueHandle) -> bool;
}

#[derive(Debug, Clone)]
struct OpenDialogue {
    key: String,
    cursor: usize,
    frames_left: Option<u32>,
}

/// Plays back beats registered per dialogue key.
#[derive(Debug, Default, Clone)]
pub struct ScriptedDialogue {
    scripts: BTreeMap<String, Vec<DialogueBeat>>,
    open: BTreeMap<DialogueHandle, OpenDialogue>,
    next_handle: u32,
    transcript: Vec<String>,
}

impl ScriptedDialogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, key: impl Into<String>, beats: Vec<DialogueBeat>) -> Self {
        self.insert(key, beats);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, beats: Vec<DialogueBeat>) {
        self.scripts.insert(key.into(), beats);
    }

    /// Every open, close and beat played so far. Grows until drained with
    /// [`take_transcript`](Self::take_transcript).
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn take_transcript(&mut self) -> Vec<String> {
        std::mem::take(&mut self.transcript)
    }
}

impl DialoguePlayer for ScriptedDialogue {
    fn open(&mut self, key: &str) -> Result<DialogueHandle, Unavailable> {
        if !self.scripts.contains_key(key) {
            log::warn!("{}", ContentError::UnknownDialogue(key.to_string()));
            return Err(Unavailable::Dialogue(key.to_string()));
        }
        self.next_handle = self.next_handle.wrapping_add(1);
        let handle = DialogueHandle(self.next_handle);
        self.open.insert(
            handle,
            OpenDialogue {
                key: key.to_string(),
                cursor: 0,
                frames_left: None,
            },
        );
        self.transcript.push(format!("dialogue.open {key}"));
        Ok(handle)
    }

    fn poll(&mut self, handle: DialogueHandle) -> DialogueEvent {
        let Some(state) = self.open.get_mut(&handle) else {
            return DialogueEvent::Closed;
        };
        let beats = self.scripts.get(&state.key).map(Vec::as_slice).unwrap_or(&[]);

        while let Some(beat) = beats.get(state.cursor) {
            match *beat {
                DialogueBeat::Page { frames } => {
                    let left = match state.frames_left {
                        Some(left) => left,
                        None => {
                            self.transcript
                                .push(format!("dialogue.page {} {}", state.key, state.cursor));
                            frames
                        }
                    };
                    if left > 0 {
                        state.frames_left = Some(left - 1);
                        return DialogueEvent::Showing;
                    }
                    state.frames_left = None;
                    state.cursor += 1;
                }
                DialogueBeat::Milestone(index) => {
                    state.cursor += 1;
                    return DialogueEvent::Milestone(index);
                }
            }
        }

        let key = state.key.clone();
        self.open.remove(&handle);
        self.transcript.push(format!("dialogue.close {key}"));
        DialogueEvent::Closed
    }

    fn close(&mut self, handle: DialogueHandle) -> bool {
        match self.open.remove(&handle) {
            Some(state) => {
                self.transcript
                    .push(format!("dialogue.close {} (early)", state.key));
                true
            }
            None => false,
        }
    }

    fn is_open(&self, handle: DialogueHandle) -> bool {
        self.open.contains_key(&handle)
    }
}
