//! JSON configuration parsing for headless mode
//!
//! Parses JSON scenario files: which players exist, which perks they start
//! with, and a timeline of scripted inputs and host events.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::abilities::ability_config::{AbilityKind, AbilityVariant};
use crate::abilities::host::{Collaborator, PlayerId};
use crate::keybindings::InputDevice;

/// Headless scenario configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadlessScenarioConfig {
    /// Players in the scenario (at least one)
    pub players: Vec<ScenarioPlayer>,
    /// Starting perk levels, e.g. `{"barrier": 1}`
    #[serde(default)]
    pub perks: BTreeMap<String, u8>,
    /// Scripted timeline
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
    /// Scenario length in seconds (default: 60)
    #[serde(default = "default_duration")]
    pub duration_secs: f64,
    /// Simulation frames per second (default: 60)
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: f64,
    /// Extra random presses of granted ability controls
    #[serde(default)]
    pub random_presses: u32,
    /// Random seed for deterministic press generation
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Custom output path for the ability log (optional)
    #[serde(default)]
    pub output_path: Option<String>,
    /// Override `AbilitySettings::isolate_player_actions`
    #[serde(default)]
    pub isolate_player_actions: Option<bool>,
}

/// One player's controlled entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioPlayer {
    pub id: PlayerId,
    /// Assigned devices, e.g. `["Keyboard"]` or `[{"Gamepad": 1}]`
    pub devices: Vec<InputDevice>,
    /// Ability names (default: every ability)
    #[serde(default = "default_grants")]
    pub grants: Vec<String>,
    /// Collaborator components left off the entity
    #[serde(default)]
    pub missing_collaborators: Vec<String>,
}

/// A timeline entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Seconds since scenario start
    pub at: f64,
    #[serde(flatten)]
    pub action: ScenarioAction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioAction {
    /// Raw control press
    Press { device: InputDevice, path: String },
    /// New wave, all cooldowns reset
    Wave,
    /// Damage breaks the player's shield
    BreakShield { player: PlayerId },
    Kill { player: PlayerId },
    Revive { player: PlayerId },
    /// Player entity despawns mid-match
    Despawn { player: PlayerId },
    SetPerk { perk: String, level: u8 },
    Rebind {
        player: PlayerId,
        ability: String,
        #[serde(default)]
        ultimate: bool,
        old: String,
        new: String,
    },
    ReduceCooldowns {
        #[serde(default)]
        player: Option<PlayerId>,
        amount: f64,
    },
    SkipCooldown { player: PlayerId, ability: String },
}

fn default_duration() -> f64 {
    60.0
}

fn default_tick_rate() -> f64 {
    60.0
}

fn default_grants() -> Vec<String> {
    AbilityKind::all().iter().map(|k| k.name().to_string()).collect()
}

impl HeadlessScenarioConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, String> {
        let config: HeadlessScenarioConfig = serde_json::from_str(contents)
            .map_err(|e| format!("Failed to parse JSON: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.players.is_empty() {
            return Err("players must not be empty".to_string());
        }

        let mut ids = HashSet::new();
        for player in &self.players {
            if !ids.insert(player.id) {
                return Err(format!("Duplicate player id {}", player.id));
            }
            for name in &player.grants {
                Self::parse_ability(name)?;
            }
            for name in &player.missing_collaborators {
                Self::parse_collaborator(name)?;
            }
        }

        if self.duration_secs <= 0.0 {
            return Err("duration_secs must be positive".to_string());
        }
        if self.tick_rate_hz <= 0.0 {
            return Err("tick_rate_hz must be positive".to_string());
        }

        for step in &self.steps {
            if step.at < 0.0 || step.at > self.duration_secs {
                return Err(format!(
                    "Step at {:.2}s is outside the scenario (0-{:.2}s)",
                    step.at, self.duration_secs
                ));
            }
            if let Some(player) = step.action.player() {
                if !ids.contains(&player) {
                    return Err(format!("Step at {:.2}s refers to unknown player {}", step.at, player));
                }
            }
            match &step.action {
                ScenarioAction::Rebind { ability, .. } | ScenarioAction::SkipCooldown { ability, .. } => {
                    Self::parse_ability(ability)?;
                }
                ScenarioAction::ReduceCooldowns { amount, .. } if *amount < 0.0 => {
                    return Err("reduce_cooldowns amount must not be negative".to_string());
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Parse an ability name into AbilityKind
    pub fn parse_ability(name: &str) -> Result<AbilityKind, String> {
        AbilityKind::parse(name).ok_or_else(|| {
            format!(
                "Unknown ability: '{}'. Valid abilities: Barrier, Resupply, Shockwave, Adrenaline",
                name
            )
        })
    }

    /// Parse a collaborator name into Collaborator
    pub fn parse_collaborator(name: &str) -> Result<Collaborator, String> {
        match name {
            "DamageShield" => Ok(Collaborator::DamageShield),
            "Weapon" => Ok(Collaborator::Weapon),
            "Physics" => Ok(Collaborator::Physics),
            "Movement" => Ok(Collaborator::Movement),
            _ => Err(format!(
                "Unknown collaborator: '{}'. Valid collaborators: DamageShield, Weapon, Physics, Movement",
                name
            )),
        }
    }

    /// Steps sorted by time, stable for equal times
    pub fn sorted_steps(&self) -> Vec<ScenarioStep> {
        let mut steps = self.steps.clone();
        steps.sort_by(|a, b| a.at.total_cmp(&b.at));
        steps
    }
}

impl ScenarioPlayer {
    pub fn grant_kinds(&self) -> Vec<AbilityKind> {
        self.grants
            .iter()
            .filter_map(|name| AbilityKind::parse(name))
            .collect()
    }

    pub fn has_collaborator(&self, collaborator: Collaborator) -> bool {
        !self
            .missing_collaborators
            .iter()
            .any(|name| HeadlessScenarioConfig::parse_collaborator(name).ok() == Some(collaborator))
    }
}

impl ScenarioAction {
    /// The player this action targets, if any
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            ScenarioAction::BreakShield { player }
            | ScenarioAction::Kill { player }
            | ScenarioAction::Revive { player }
            | ScenarioAction::Despawn { player }
            | ScenarioAction::Rebind { player, .. }
            | ScenarioAction::SkipCooldown { player, .. } => Some(*player),
            ScenarioAction::ReduceCooldowns { player, .. } => *player,
            ScenarioAction::Press { .. } | ScenarioAction::Wave | ScenarioAction::SetPerk { .. } => None,
        }
    }

    pub fn variant(ultimate: bool) -> AbilityVariant {
        if ultimate {
            AbilityVariant::Ultimate
        } else {
            AbilityVariant::Base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = HeadlessScenarioConfig::from_json(r#"{"players": [{"id": 0, "devices": ["Keyboard"]}]}"#)
            .unwrap();
        assert_eq!(config.duration_secs, 60.0);
        assert_eq!(config.tick_rate_hz, 60.0);
        assert_eq!(config.players[0].grant_kinds().len(), 4);
        assert!(config.players[0].has_collaborator(Collaborator::DamageShield));
    }

    #[test]
    fn test_steps_parse_with_flattened_action() {
        let config = HeadlessScenarioConfig::from_json(
            r#"{
                "players": [{"id": 2, "devices": [{"Gamepad": 7}]}],
                "steps": [
                    {"at": 1.5, "action": "press", "device": {"Gamepad": 7}, "path": "<Gamepad>/West"},
                    {"at": 0.5, "action": "wave"},
                    {"at": 2.0, "action": "break_shield", "player": 2}
                ]
            }"#,
        )
        .unwrap();
        let steps = config.sorted_steps();
        assert_eq!(steps[0].action, ScenarioAction::Wave);
        assert_eq!(
            steps[1].action,
            ScenarioAction::Press {
                device: InputDevice::Gamepad(7),
                path: "<Gamepad>/West".to_string()
            }
        );
        assert_eq!(steps[2].action.player(), Some(2));
    }

    #[test]
    fn test_validation_errors() {
        let unknown_player = r#"{"players": [{"id": 0, "devices": []}],
            "steps": [{"at": 1.0, "action": "kill", "player": 9}]}"#;
        assert!(HeadlessScenarioConfig::from_json(unknown_player)
            .unwrap_err()
            .contains("unknown player 9"));

        let bad_grant = r#"{"players": [{"id": 0, "devices": [], "grants": ["Fireball"]}]}"#;
        assert!(HeadlessScenarioConfig::from_json(bad_grant)
            .unwrap_err()
            .contains("Unknown ability"));

        let late_step = r#"{"players": [{"id": 0, "devices": []}], "duration_secs": 5,
            "steps": [{"at": 9.0, "action": "wave"}]}"#;
        assert!(HeadlessScenarioConfig::from_json(late_step).is_err());

        let no_players = r#"{"players": []}"#;
        assert!(HeadlessScenarioConfig::from_json(no_players).is_err());
    }
}
