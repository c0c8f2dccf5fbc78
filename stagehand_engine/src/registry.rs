use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::ContentError;
use crate::finale::Finale;
use crate::task::Task;
use crate::types::ActorId;

/// One fresh instance of a narrative script: the root task, the load-bearing
/// effects a run must end with, and the actors it holds for its duration.
pub struct Cutscene {
    name: String,
    root: Task,
    finale: Finale,
    actors: Vec<ActorId>,
}

impl Cutscene {
    pub fn new(name: impl Into<String>, root: Task) -> Self {
        Self {
            name: name.into(),
            root,
            finale: Finale::new(),
            actors: Vec::new(),
        }
    }

    pub fn with_finale(mut self, finale: Finale) -> Self {
        self.finale = finale;
        self
    }

    pub fn with_actor(mut self, actor: impl Into<ActorId>) -> Self {
        let actor = actor.into();
        if !self.actors.contains(&actor) {
            self.actors.push(actor);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Task {
        &self.root
    }

    pub fn finale(&self) -> &Finale {
        &self.finale
    }

    pub fn actors(&self) -> &[ActorId] {
        &self.actors
    }

    pub(crate) fn into_parts(self) -> (String, Task, Finale, Vec<ActorId>) {
        (self.name, self.root, self.finale, self.actors)
    }
}

impl fmt::Debug for Cutscene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cutscene")
            .field("name", &self.name)
            .field("root", &self.root.label())
            .field("finale", &self.finale)
            .field("actors", &self.actors)
            .finish()
    }
}

type Factory = Rc<dyn Fn() -> Cutscene>;

/// Maps cutscene names to factories. Holds no per-run state: every
/// [`create`](CutsceneRegistry::create) builds a fresh cutscene.
#[derive(Default, Clone)]
pub struct CutsceneRegistry {
    factories: BTreeMap<String, Factory>,
}

impl CutsceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name`, replacing any earlier binding. Returns true when one was
    /// replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Cutscene + 'static,
    ) -> bool {
        let name = name.into();
        let replaced = self.factories.insert(name.clone(), Rc::new(factory)).is_some();
        if replaced {
            log::info!("cutscene '{name}' re-registered; the latest factory wins");
        }
        replaced
    }

    /// Registers a bare task factory with no finale and no controlled actors.
    pub fn register_task(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Task + 'static,
    ) -> bool {
        let name = name.into();
        let label = name.clone();
        self.register(name, move || Cutscene::new(label.clone(), factory()))
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.factories.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn create(&self, name: &str) -> Result<Cutscene, ContentError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ContentError::UnknownCutscene(name.to_string()))?;
        Ok(factory())
    }

    pub fn clear(&mut self) {
        self.factories.clear();
    }
}

impl fmt::Debug for CutsceneRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}
