use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde::Serialize;

use crate::types::{EffectHandle, SoundHandle, Vec2};

/// Camera, screen and sound cues. Purely cosmetic: nothing load-bearing may
/// depend on an effect having played.
pub trait Effects {
    fn zoom(&mut self, scale: f32, seconds: f32) -> EffectHandle;
    fn pan(&mut self, target: Vec2, seconds: f32) -> EffectHandle;
    fn shake(&mut self, intensity: f32, seconds: f32) -> EffectHandle;
    fn flash(&mut self, seconds: f32) -> EffectHandle;
    fn is_playing(&self, handle: EffectHandle) -> bool;
    fn stop(&mut self, handle: EffectHandle);
    fn play_sound(&mut self, cue: &str) -> SoundHandle;
    fn stop_sound(&mut self, handle: SoundHandle);
    fn is_sound_playing(&self, handle: SoundHandle) -> bool;
    fn advance(&mut self, _elapsed: f32) {}
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectEvent {
    Zoom { handle: u32, scale: f32, seconds: f32 },
    Pan { handle: u32, target: Vec2, seconds: f32 },
    Shake { handle: u32, intensity: f32, seconds: f32 },
    Flash { handle: u32, seconds: f32 },
    Stop { handle: u32 },
    SoundPlay { handle: u32, cue: String },
    SoundStop { handle: u32 },
}

#[derive(Debug, Default)]
struct EffectsState {
    next_handle: u32,
    running: BTreeMap<EffectHandle, f32>,
    sounds: BTreeSet<SoundHandle>,
    events: Vec<EffectEvent>,
}

impl EffectsState {
    fn allocate(&mut self) -> u32 {
        self.next_handle = self.next_handle.wrapping_add(1);
        self.next_handle
    }

    fn start(&mut self, seconds: f32, event: impl FnOnce(u32) -> EffectEvent) -> EffectHandle {
        let raw = self.allocate();
        self.events.push(event(raw));
        let handle = EffectHandle(raw);
        if seconds > 0.0 {
            self.running.insert(handle, seconds);
        }
        handle
    }
}

/// Records every cue and times effects against the elapsed time it is fed.
///
/// Clones share the same recording, so a host can keep one handle while the
/// world owns another.
#[derive(Clone, Default)]
pub struct RecordingEffects {
    state: Rc<RefCell<EffectsState>>,
}

impl RecordingEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EffectEvent> {
        self.state.borrow().events.clone()
    }

    pub fn active_sounds(&self) -> usize {
        self.state.borrow().sounds.len()
    }
}

impl Effects for RecordingEffects {
    fn zoom(&mut self, scale: f32, seconds: f32) -> EffectHandle {
        self.state
            .borrow_mut()
            .start(seconds, |handle| EffectEvent::Zoom {
                handle,
                scale,
                seconds,
            })
    }

    fn pan(&mut self, target: Vec2, seconds: f32) -> EffectHandle {
        self.state
            .borrow_mut()
            .start(seconds, |handle| EffectEvent::Pan {
                handle,
                target,
                seconds,
            })
    }

    fn shake(&mut self, intensity: f32, seconds: f32) -> EffectHandle {
        self.state
            .borrow_mut()
            .start(seconds, |handle| EffectEvent::Shake {
                handle,
                intensity,
                seconds,
            })
    }

    fn flash(&mut self, seconds: f32) -> EffectHandle {
        self.state
            .borrow_mut()
            .start(seconds, |handle| EffectEvent::Flash { handle, seconds })
    }

    fn is_playing(&self, handle: EffectHandle) -> bool {
        self.state.borrow().running.contains_key(&handle)
    }

    fn stop(&mut self, handle: EffectHandle) {
        let mut state = self.state.borrow_mut();
        if state.running.remove(&handle).is_some() {
            state.events.push(EffectEvent::Stop { handle: handle.0 });
        }
    }

    fn play_sound(&mut self, cue: &str) -> SoundHandle {
        let mut state = self.state.borrow_mut();
        let raw = state.allocate();
        state.events.push(EffectEvent::SoundPlay {
            handle: raw,
            cue: cue.to_string(),
        });
        let handle = SoundHandle(raw);
        state.sounds.insert(handle);
        handle
    }

    fn stop_sound(&mut self, handle: SoundHandle) {
        let mut state = self.state.borrow_mut();
        if state.sounds.remove(&handle) {
            state.events.push(EffectEvent::SoundStop { handle: handle.0 });
        }
    }

    fn is_sound_playing(&self, handle: SoundHandle) -> bool {
        self.state.borrow().sounds.contains(&handle)
    }

    fn advance(&mut self, elapsed: f32) {
        let mut state = self.state.borrow_mut();
        state.running.retain(|_, remaining| {
            *remaining -= elapsed;
            *remaining > 0.0
        });
    }
}
