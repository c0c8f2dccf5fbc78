use std::collections::BTreeMap;

use crate::error::Unavailable;
use crate::types::{EntityId, Vec2};

/// Queries against the active scene's entity set.
///
/// Every call may fail or come back empty; callers treat absence as a normal
/// outcome. Kinds are content-chosen tags, not type names.
pub trait EntityLookup {
    fn find_by_kind(&self, kind: &str) -> Result<Vec<EntityId>, Unavailable>;
    fn spawn(&mut self, kind: &str, at: Vec2) -> Result<EntityId, Unavailable>;
    /// Returns `Ok(false)` when the entity was already gone.
    fn remove(&mut self, id: EntityId) -> Result<bool, Unavailable>;
    fn contains(&self, id: EntityId) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub kind: String,
    pub position: Vec2,
}

#[derive(Debug, Clone)]
pub struct EntitySet {
    next_id: u32,
    entities: BTreeMap<EntityId, EntityRecord>,
    offline: bool,
}

impl Default for EntitySet {
    fn default() -> Self {
        Self {
            next_id: 1,
            entities: BTreeMap::new(),
            offline: false,
        }
    }
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent query fail, the way a scene that is being torn
    /// down answers.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn ensure_online(&self) -> Result<(), Unavailable> {
        if self.offline {
            Err(Unavailable::Lookup("entity set is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl EntityLookup for EntitySet {
    fn find_by_kind(&self, kind: &str) -> Result<Vec<EntityId>, Unavailable> {
        self.ensure_online()?;
        Ok(self
            .entities
            .iter()
            .filter(|(_, record)| record.kind == kind)
            .map(|(id, _)| *id)
            .collect())
    }

    fn spawn(&mut self, kind: &str, at: Vec2) -> Result<EntityId, Unavailable> {
        self.ensure_online()?;
        let id = EntityId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entities.insert(
            id,
            EntityRecord {
                kind: kind.to_string(),
                position: at,
            },
        );
        Ok(id)
    }

    fn remove(&mut self, id: EntityId) -> Result<bool, Unavailable> {
        self.ensure_online()?;
        Ok(self.entities.remove(&id).is_some())
    }

    fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_kind_filters_tags() {
        let mut set = EntitySet::new();
        let lantern = set.spawn("lantern", Vec2::new(1.0, 0.0)).unwrap();
        set.spawn("crate", Vec2::default()).unwrap();

        assert_eq!(set.find_by_kind("lantern"), Ok(vec![lantern]));
        assert_eq!(set.find_by_kind("gull"), Ok(Vec::new()));
        assert_eq!(set.remove(lantern), Ok(true));
        assert_eq!(set.remove(lantern), Ok(false));
    }

    #[test]
    fn offline_set_fails_every_query() {
        let mut set = EntitySet::new();
        set.set_offline(true);
        assert!(set.find_by_kind("lantern").is_err());
        assert!(set.spawn("lantern", Vec2::default()).is_err());
        assert!(set.remove(EntityId(1)).is_err());
    }
}
