use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::types::{ActorId, DialogueHandle, EffectHandle, EntityId, SoundHandle};
use crate::world::World;

/// Something a running script acquired that its director must give back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Helper(EntityId),
    Sound(SoundHandle),
    Effect(EffectHandle),
    Dialogue(DialogueHandle),
    Lock(ActorId),
}

impl Resource {
    pub fn label(&self) -> String {
        match self {
            Resource::Helper(id) => format!("helper #{id}"),
            Resource::Sound(handle) => format!("sound #{handle}"),
            Resource::Effect(handle) => format!("effect #{handle}"),
            Resource::Dialogue(handle) => format!("dialogue #{handle}"),
            Resource::Lock(actor) => format!("lock {actor}"),
        }
    }

    /// Releasing something that is already gone succeeds.
    pub(crate) fn release(&self, world: &mut World) -> Result<(), EngineError> {
        match self {
            Resource::Helper(id) => {
                if !world.entities_mut().remove(*id)? {
                    world.log_event(format!("resource.release {} (already gone)", self.label()));
                    return Ok(());
                }
            }
            Resource::Sound(handle) => world.effects_mut().stop_sound(*handle),
            Resource::Effect(handle) => world.effects_mut().stop(*handle),
            Resource::Dialogue(handle) => {
                world.dialogue_mut().close(*handle);
            }
            Resource::Lock(actor) => world.actors_mut().unlock(actor)?,
        }
        world.log_event(format!("resource.release {}", self.label()));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(u32);

/// Resources owned by one director for the duration of a run.
#[derive(Debug, Default)]
pub struct ResourceSet {
    next_id: u32,
    held: BTreeMap<ResourceId, Resource>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hold(&mut self, resource: Resource) -> ResourceId {
        self.next_id = self.next_id.wrapping_add(1);
        let id = ResourceId(self.next_id);
        self.held.insert(id, resource);
        id
    }

    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.held.get(&id)
    }

    pub fn find(&self, resource: &Resource) -> Option<ResourceId> {
        self.held
            .iter()
            .find_map(|(id, held)| (held == resource).then_some(*id))
    }

    /// Stops tracking a resource the script disposed of itself.
    pub fn forget(&mut self, id: ResourceId) -> Option<Resource> {
        self.held.remove(&id)
    }

    pub fn release(&mut self, id: ResourceId, world: &mut World) -> Result<bool, EngineError> {
        match self.held.remove(&id) {
            Some(resource) => resource.release(world).map(|()| true),
            None => Ok(false),
        }
    }

    /// Releases everything, newest first. A failure is reported and the
    /// remaining resources are still released.
    pub fn release_all(&mut self, world: &mut World) -> Vec<(String, EngineError)> {
        let mut failures = Vec::new();
        while let Some((_, resource)) = self.held.pop_last() {
            if let Err(err) = resource.release(world) {
                failures.push((resource.label(), err));
            }
        }
        failures
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &Resource)> {
        self.held.iter()
    }
}
