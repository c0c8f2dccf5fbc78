use serde::{Deserialize, Serialize};

const DEFAULT_MAX_RESUMES_PER_STEP: u32 = 256;

/// How the engine reacts to an [`InvariantViolation`](crate::InvariantViolation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationPolicy {
    /// Fail fast. The default for debug builds.
    Panic,
    /// Log and degrade to a no-op. The default for release builds.
    Log,
}

impl ViolationPolicy {
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            ViolationPolicy::Panic
        } else {
            ViolationPolicy::Log
        }
    }
}

impl Default for ViolationPolicy {
    fn default() -> Self {
        Self::for_build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub violations: ViolationPolicy,
    /// Upper bound on script resumptions performed by one `Sequencer::step`.
    pub max_resumes_per_step: u32,
}

impl EngineConfig {
    pub fn lenient() -> Self {
        Self {
            violations: ViolationPolicy::Log,
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            violations: ViolationPolicy::for_build(),
            max_resumes_per_step: DEFAULT_MAX_RESUMES_PER_STEP,
        }
    }
}
