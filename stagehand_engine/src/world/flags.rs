use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Persistent flags and counters. Setting a flag twice is harmless; counters
/// are not idempotent.
pub trait FlagStore {
    fn set_flag(&mut self, name: &str);
    fn get_flag(&self, name: &str) -> bool;
    fn get_counter(&self, name: &str) -> i64;
    fn increment_counter(&mut self, name: &str) -> i64;
    fn snapshot(&self) -> FlagSnapshot;
}

/// Serializable copy of a flag store, used to hand state across runs.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSnapshot {
    #[serde(default)]
    pub flags: BTreeSet<String>,
    #[serde(default)]
    pub counters: BTreeMap<String, i64>,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryFlags {
    state: FlagSnapshot,
}

impl MemoryFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(state: FlagSnapshot) -> Self {
        Self { state }
    }
}

impl FlagStore for MemoryFlags {
    fn set_flag(&mut self, name: &str) {
        self.state.flags.insert(name.to_string());
    }

    fn get_flag(&self, name: &str) -> bool {
        self.state.flags.contains(name)
    }

    fn get_counter(&self, name: &str) -> i64 {
        self.state.counters.get(name).copied().unwrap_or(0)
    }

    fn increment_counter(&mut self, name: &str) -> i64 {
        let counter = self.state.counters.entry(name.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    fn snapshot(&self) -> FlagSnapshot {
        self.state.clone()
    }
}
