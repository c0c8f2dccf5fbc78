use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use stagehand_engine::{
    EngineConfig, Rect, StageActors, Trigger, TriggerCondition, Vec2, ViolationPolicy,
};

/// A scene description: who stands where and which cutscenes wait for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneConfig {
    pub name: String,
    #[serde(default)]
    pub engine: Option<EngineConfig>,
    pub actors: Vec<ActorSpec>,
    pub triggers: Vec<TriggerSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActorSpec {
    pub id: String,
    pub position: [f32; 2],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerSpec {
    pub cutscene: String,
    pub actor: String,
    #[serde(default)]
    pub when: ConditionSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionSpec {
    /// Fires on the first tick.
    #[default]
    Immediate,
    /// Fires once the flag is set.
    Flag { name: String },
    /// Fires once the trigger's actor stands inside the region.
    Region { min: [f32; 2], max: [f32; 2] },
}

impl ConditionSpec {
    fn condition(&self) -> TriggerCondition {
        match self {
            ConditionSpec::Immediate => TriggerCondition::when(|_| true),
            ConditionSpec::Flag { name } => {
                let name = name.clone();
                TriggerCondition::when(move |world| world.flags().get_flag(&name))
            }
            ConditionSpec::Region { min, max } => {
                TriggerCondition::Region(Rect::new(Vec2::from(*min), Vec2::from(*max)))
            }
        }
    }
}

impl TriggerSpec {
    pub fn build(&self) -> Trigger {
        Trigger::new(self.cutscene.clone(), self.actor.as_str())
            .with_condition(self.when.condition())
    }
}

impl SceneConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read scene file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse scene json: {}", path.display()))
    }

    /// The built-in scene: a greeting, a briefing on the dock once greeted,
    /// and the ferry once the player has walked onto the pier.
    pub fn harbor() -> Self {
        SceneConfig {
            name: "harbor".to_string(),
            engine: None,
            actors: vec![
                ActorSpec {
                    id: "player".to_string(),
                    position: [0.0, 0.0],
                },
                ActorSpec {
                    id: "mentor".to_string(),
                    position: [6.0, 0.0],
                },
                ActorSpec {
                    id: "ferryman".to_string(),
                    position: [12.0, 0.0],
                },
            ],
            triggers: vec![
                TriggerSpec {
                    cutscene: "greet".to_string(),
                    actor: "player".to_string(),
                    when: ConditionSpec::Immediate,
                },
                TriggerSpec {
                    cutscene: "dock_briefing".to_string(),
                    actor: "player".to_string(),
                    when: ConditionSpec::Flag {
                        name: "greeted".to_string(),
                    },
                },
                TriggerSpec {
                    cutscene: "ferry_ride".to_string(),
                    actor: "player".to_string(),
                    when: ConditionSpec::Region {
                        min: [9.0, -1.0],
                        max: [11.0, 1.0],
                    },
                },
            ],
        }
    }

    /// The scene's engine settings, with `--lenient` forcing the log policy.
    pub fn engine_config(&self, lenient: bool) -> EngineConfig {
        let mut config = self.engine.unwrap_or_default();
        if lenient {
            config.violations = ViolationPolicy::Log;
        }
        config
    }

    pub fn stage_actors(&self) -> StageActors {
        let mut actors = StageActors::new();
        for actor in &self.actors {
            actors.insert(actor.id.as_str(), Vec2::from(actor.position));
        }
        actors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_engine::{ActorControl, ActorId, World};

    #[test]
    fn parses_a_scene_with_defaults() {
        let scene: SceneConfig = serde_json::from_str(
            r#"{
                "name": "pier",
                "actors": [{ "id": "player", "position": [1.0, 2.0] }],
                "triggers": [
                    { "cutscene": "greet", "actor": "player" },
                    { "cutscene": "ferry_ride", "actor": "player",
                      "when": { "kind": "flag", "name": "briefed" } }
                ]
            }"#,
        )
        .expect("scene parses");

        assert_eq!(scene.triggers.len(), 2);
        assert!(matches!(scene.triggers[0].when, ConditionSpec::Immediate));
        assert!(scene.engine.is_none());
        let actors = scene.stage_actors();
        assert_eq!(
            actors.position(&ActorId::from("player")),
            Some(Vec2::new(1.0, 2.0))
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed = serde_json::from_str::<SceneConfig>(
            r#"{ "name": "x", "actors": [], "triggers": [], "music": "sea" }"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn flag_condition_reads_the_world() {
        let condition = ConditionSpec::Flag {
            name: "greeted".to_string(),
        }
        .condition();
        let player = ActorId::from("player");
        let mut world = World::in_memory();
        assert!(!condition.holds(&player, &world));
        world.flags_mut().set_flag("greeted");
        assert!(condition.holds(&player, &world));
    }

    #[test]
    fn lenient_overrides_the_scene_policy() {
        let mut scene = SceneConfig::harbor();
        scene.engine = Some(EngineConfig {
            violations: ViolationPolicy::Panic,
            max_resumes_per_step: 32,
        });
        let config = scene.engine_config(true);
        assert_eq!(config.violations, ViolationPolicy::Log);
        assert_eq!(config.max_resumes_per_step, 32);
    }
}
