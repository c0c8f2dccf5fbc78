use std::collections::BTreeMap;

use crate::error::Unavailable;
use crate::types::{ActorId, Facing, Vec2};

/// Cutscene-facing view of the controllable characters.
///
/// Locks are counted: each `lock` is balanced by exactly one `unlock`, and an
/// actor stays in cutscene mode while any holder remains.
pub trait ActorControl {
    fn exists(&self, actor: &ActorId) -> bool;
    fn lock(&mut self, actor: &ActorId) -> Result<(), Unavailable>;
    fn unlock(&mut self, actor: &ActorId) -> Result<(), Unavailable>;
    fn is_locked(&self, actor: &ActorId) -> bool;
    fn set_facing(&mut self, actor: &ActorId, facing: Facing) -> Result<(), Unavailable>;
    fn set_position(&mut self, actor: &ActorId, position: Vec2) -> Result<(), Unavailable>;
    fn position(&self, actor: &ActorId) -> Option<Vec2>;
    fn facing(&self, actor: &ActorId) -> Option<Facing>;
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ActorSnapshot {
    pub position: Vec2,
    pub facing: Facing,
    pub locks: u32,
}

#[derive(Debug, Default, Clone)]
pub struct StageActors {
    actors: BTreeMap<ActorId, ActorSnapshot>,
}

impl StageActors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<ActorId>, position: Vec2) -> &mut ActorSnapshot {
        let entry = self.actors.entry(id.into()).or_default();
        entry.position = position;
        entry
    }

    pub fn remove(&mut self, id: &ActorId) -> Option<ActorSnapshot> {
        self.actors.remove(id)
    }

    pub fn get(&self, id: &ActorId) -> Option<&ActorSnapshot> {
        self.actors.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ActorId> {
        self.actors.keys()
    }

    fn get_mut(&mut self, id: &ActorId) -> Result<&mut ActorSnapshot, Unavailable> {
        self.actors
            .get_mut(id)
            .ok_or_else(|| Unavailable::Actor(id.clone()))
    }
}

impl ActorControl for StageActors {
    fn exists(&self, actor: &ActorId) -> bool {
        self.actors.contains_key(actor)
    }

    fn lock(&mut self, actor: &ActorId) -> Result<(), Unavailable> {
        let snapshot = self.get_mut(actor)?;
        snapshot.locks = snapshot.locks.saturating_add(1);
        Ok(())
    }

    fn unlock(&mut self, actor: &ActorId) -> Result<(), Unavailable> {
        let snapshot = self.get_mut(actor)?;
        snapshot.locks = snapshot.locks.saturating_sub(1);
        Ok(())
    }

    fn is_locked(&self, actor: &ActorId) -> bool {
        self.actors
            .get(actor)
            .map(|snapshot| snapshot.locks > 0)
            .unwrap_or(false)
    }

    fn set_facing(&mut self, actor: &ActorId, facing: Facing) -> Result<(), Unavailable> {
        self.get_mut(actor)?.facing = facing;
        Ok(())
    }

    fn set_position(&mut self, actor: &ActorId, position: Vec2) -> Result<(), Unavailable> {
        self.get_mut(actor)?.position = position;
        Ok(())
    }

    fn position(&self, actor: &ActorId) -> Option<Vec2> {
        self.actors.get(actor).map(|snapshot| snapshot.position)
    }

    fn facing(&self, actor: &ActorId) -> Option<Facing> {
        self.actors.get(actor).map(|snapshot| snapshot.facing)
    }
}
