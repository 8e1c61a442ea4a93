//! Data-Driven Ability Configuration
//!
//! Ability specs are loaded once at startup from `assets/config/abilities.ron`
//! and never mutated afterwards. Instances share them through `Arc`.
//!
//! ## Usage
//! ```ignore
//! fn my_system(abilities: Res<AbilityDefinitions>) {
//!     let spec = abilities.get(AbilityKind::Barrier).unwrap();
//!     println!("Barrier base cooldown: {}", spec.base_cooldown);
//! }
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::constants::DEFAULT_UPGRADE_TIER;

/// Closed set of ability kinds. Each kind supplies its own effect hooks;
/// the lifecycle state machine is shared.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, PartialOrd, Ord)]
pub enum AbilityKind {
    /// Damage shield on the player's entity; can be broken early by damage
    Barrier,
    /// Refills ammunition over the duration
    Resupply,
    /// Instant area knockback around the player
    Shockwave,
    /// Movement and fire-rate boost
    Adrenaline,
}

impl AbilityKind {
    pub fn all() -> [AbilityKind; 4] {
        [
            AbilityKind::Barrier,
            AbilityKind::Resupply,
            AbilityKind::Shockwave,
            AbilityKind::Adrenaline,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            AbilityKind::Barrier => "Barrier",
            AbilityKind::Resupply => "Resupply",
            AbilityKind::Shockwave => "Shockwave",
            AbilityKind::Adrenaline => "Adrenaline",
        }
    }

    /// Parse a kind from its display name (case-insensitive)
    pub fn parse(name: &str) -> Option<AbilityKind> {
        Self::all()
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }
}

/// Which activation of an ability slot is meant
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum AbilityVariant {
    Base,
    Ultimate,
}

fn default_upgrade_tier() -> u8 {
    DEFAULT_UPGRADE_TIER
}

/// Immutable definition of one ability type.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AbilitySpec {
    /// Display name of the ability
    pub name: String,
    /// Perk that unlocks (level 1) and upgrades (level >= `upgrade_tier`) the ability
    pub perk_key: String,
    /// Perk gating the ultimate; defaults to `<perk_key>_ultimate`
    #[serde(default)]
    pub ultimate_perk_key: Option<String>,

    // === Base ability ===
    /// Seconds the ability stays active (0.0 = instant)
    #[serde(default)]
    pub base_duration: f32,
    /// Seconds of cooldown after the ability ends
    pub base_cooldown: f32,
    /// Added to the duration per applicable modifier
    #[serde(default)]
    pub duration_delta: f32,
    /// Removed from the cooldown per applicable modifier
    #[serde(default)]
    pub cooldown_delta: f32,

    // === Ultimate ===
    #[serde(default)]
    pub ultimate_duration: f32,
    #[serde(default)]
    pub ultimate_cooldown: f32,
    #[serde(default)]
    pub ultimate_duration_delta: f32,
    #[serde(default)]
    pub ultimate_cooldown_delta: f32,

    // === Area ===
    /// Effect radius in world units (0.0 = not an area ability)
    #[serde(default)]
    pub base_radius: f32,
    #[serde(default)]
    pub radius_delta: f32,

    /// Perk level from which the per-level deltas apply
    #[serde(default = "default_upgrade_tier")]
    pub upgrade_tier: u8,

    // === Triggers ===
    /// Control paths that activate the base ability (keyboard and gamepad)
    pub activation_paths: Vec<String>,
    /// Control paths that activate the ultimate
    #[serde(default)]
    pub ultimate_paths: Vec<String>,

    // === Cues ===
    #[serde(default)]
    pub activate_cue: Option<String>,
    #[serde(default)]
    pub ultimate_cue: Option<String>,
}

impl AbilitySpec {
    /// Perk key gating the ultimate variant
    pub fn ultimate_key(&self) -> String {
        self.ultimate_perk_key
            .clone()
            .unwrap_or_else(|| format!("{}_ultimate", self.perk_key))
    }

    /// Instant abilities run their effect once and deactivate immediately
    pub fn is_instant(&self, variant: AbilityVariant) -> bool {
        match variant {
            AbilityVariant::Base => self.base_duration <= 0.0,
            AbilityVariant::Ultimate => self.ultimate_duration <= 0.0,
        }
    }

    pub fn has_ultimate(&self) -> bool {
        !self.ultimate_paths.is_empty()
    }

    pub fn paths(&self, variant: AbilityVariant) -> &[String] {
        match variant {
            AbilityVariant::Base => &self.activation_paths,
            AbilityVariant::Ultimate => &self.ultimate_paths,
        }
    }

    pub fn cue(&self, variant: AbilityVariant) -> Option<&str> {
        match variant {
            AbilityVariant::Base => self.activate_cue.as_deref(),
            AbilityVariant::Ultimate => self.ultimate_cue.as_deref().or(self.activate_cue.as_deref()),
        }
    }
}

/// Root structure for the abilities.ron file
#[derive(Debug, Serialize, Deserialize)]
pub struct AbilitiesConfig {
    pub abilities: HashMap<AbilityKind, AbilitySpec>,
}

/// Resource containing all ability definitions.
#[derive(Resource, Clone, Debug)]
pub struct AbilityDefinitions {
    definitions: HashMap<AbilityKind, Arc<AbilitySpec>>,
}

impl Default for AbilityDefinitions {
    /// Load ability definitions from the default config file.
    /// Panics if the file cannot be loaded - use for tests only.
    fn default() -> Self {
        load_ability_definitions().expect("Failed to load ability definitions in Default impl")
    }
}

impl AbilityDefinitions {
    /// Create from a loaded config
    pub fn new(config: AbilitiesConfig) -> Self {
        Self {
            definitions: config
                .abilities
                .into_iter()
                .map(|(kind, spec)| (kind, Arc::new(spec)))
                .collect(),
        }
    }

    /// Parse definitions from RON text
    pub fn from_ron(contents: &str) -> Result<Self, String> {
        let config: AbilitiesConfig =
            ron::from_str(contents).map_err(|e| format!("Failed to parse ability config: {}", e))?;
        Ok(Self::new(config))
    }

    pub fn get(&self, kind: AbilityKind) -> Option<&Arc<AbilitySpec>> {
        self.definitions.get(&kind)
    }

    /// Get the spec for an ability kind, panicking if not found.
    /// Use this when you know the ability must exist (validated at startup).
    pub fn get_unchecked(&self, kind: AbilityKind) -> &Arc<AbilitySpec> {
        self.definitions
            .get(&kind)
            .unwrap_or_else(|| panic!("Ability {:?} not found in definitions", kind))
    }

    /// Check that every kind is defined and every spec is usable
    pub fn validate(&self) -> Result<(), String> {
        let missing: Vec<AbilityKind> = AbilityKind::all()
            .into_iter()
            .filter(|kind| !self.definitions.contains_key(kind))
            .collect();
        if !missing.is_empty() {
            return Err(format!("Missing ability definitions: {:?}", missing));
        }

        for (kind, spec) in &self.definitions {
            if spec.perk_key.is_empty() {
                return Err(format!("{:?} has an empty perk key", kind));
            }
            if spec.base_cooldown < 0.0 || spec.ultimate_cooldown < 0.0 {
                return Err(format!("{:?} has a negative cooldown", kind));
            }
            if spec.activation_paths.is_empty() {
                return Err(format!("{:?} has no activation paths", kind));
            }
        }
        Ok(())
    }

    /// Get all ability kinds that are defined, in a stable order
    pub fn kinds(&self) -> Vec<AbilityKind> {
        let mut kinds: Vec<AbilityKind> = self.definitions.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

pub const DEFAULT_DEFINITIONS_PATH: &str = "assets/config/abilities.ron";

/// Load ability definitions from assets/config/abilities.ron
pub fn load_ability_definitions() -> Result<AbilityDefinitions, String> {
    load_ability_definitions_from(Path::new(DEFAULT_DEFINITIONS_PATH))
}

pub fn load_ability_definitions_from(config_path: &Path) -> Result<AbilityDefinitions, String> {
    let contents = std::fs::read_to_string(config_path)
        .map_err(|e| format!("Failed to read {}: {}", config_path.display(), e))?;

    let definitions = AbilityDefinitions::from_ron(&contents)
        .map_err(|e| format!("{} ({})", e, config_path.display()))?;
    definitions.validate()?;

    info!("Loaded {} ability definitions from {}", definitions.len(), config_path.display());

    Ok(definitions)
}
