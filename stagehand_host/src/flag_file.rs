use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use stagehand_engine::FlagSnapshot;

/// Flags and counters persisted between runs as a JSON file.
///
/// Writes only happen when the stored state changed since it was loaded or
/// last saved.
#[derive(Debug, Default, Clone)]
pub struct FlagFile {
    snapshot: FlagSnapshot,
    dirty: bool,
    backing_path: Option<PathBuf>,
}

impl FlagFile {
    pub fn from_json_file(path: Option<&Path>) -> Result<Self> {
        let mut file = FlagFile {
            snapshot: FlagSnapshot::default(),
            dirty: false,
            backing_path: path.map(Path::to_path_buf),
        };
        if let Some(p) = path {
            if p.exists() {
                let raw = fs::read_to_string(p)
                    .with_context(|| format!("failed to read flag file: {}", p.display()))?;
                file.snapshot = serde_json::from_str(&raw)
                    .with_context(|| format!("failed to parse flag file: {}", p.display()))?;
            }
        }
        Ok(file)
    }

    pub fn snapshot(&self) -> &FlagSnapshot {
        &self.snapshot
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn update(&mut self, snapshot: FlagSnapshot) {
        if snapshot != self.snapshot {
            self.snapshot = snapshot;
            self.dirty = true;
        }
    }

    /// Returns true when the file was written.
    pub fn save(&mut self) -> Result<bool> {
        let Some(path) = self.backing_path.as_ref() else {
            self.dirty = false;
            return Ok(false);
        };
        if !self.dirty && path.exists() {
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create flag directory: {}", parent.display())
                })?;
            }
        }

        let serialized = serde_json::to_string_pretty(&self.snapshot)
            .with_context(|| format!("failed to serialize flags: {}", path.display()))?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write flag file: {}", path.display()))?;
        self.dirty = false;
        Ok(true)
    }
}
