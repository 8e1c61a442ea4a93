//! Ability engine settings
//!
//! Tunables that are not per-ability: audio cue names and volumes, the
//! "not ready" rate limit, and whether each player works on an isolated copy
//! of the host action set.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::abilities::constants::{NOT_READY_CUE, NOT_READY_CUE_INTERVAL};

#[derive(Resource, Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AbilitySettings {
    /// Cue played when an ability is pressed while on cooldown
    pub not_ready_cue: String,
    pub not_ready_volume: f32,
    /// Minimum real-time seconds between two "not ready" cues per player
    pub not_ready_interval_secs: f64,
    /// Volume for activation cues
    pub activation_volume: f32,
    /// Give each player an isolated copy of the shared action set so local
    /// players sharing one definition do not blank each other's bindings
    pub isolate_player_actions: bool,
}

impl Default for AbilitySettings {
    fn default() -> Self {
        Self {
            not_ready_cue: NOT_READY_CUE.to_string(),
            not_ready_volume: 0.6,
            not_ready_interval_secs: NOT_READY_CUE_INTERVAL,
            activation_volume: 1.0,
            isolate_player_actions: true,
        }
    }
}

impl AbilitySettings {
    /// Get the path to the settings file
    pub fn settings_path() -> PathBuf {
        PathBuf::from("ability_settings.ron")
    }

    /// Load settings from the default file, or defaults if it doesn't exist
    pub fn load() -> Self {
        Self::load_from(&Self::settings_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No ability settings file found, using defaults");
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(contents) => match ron::from_str(&contents) {
                Ok(settings) => {
                    info!("Loaded ability settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse ability settings file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read ability settings file: {}", e);
                Self::default()
            }
        }
    }

    /// Save settings to file
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, contents)?;
        info!("Saved ability settings to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = AbilitySettings::load_from(Path::new("does/not/exist.ron"));
        assert_eq!(settings, AbilitySettings::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: AbilitySettings = ron::from_str("(not_ready_volume: 0.25)").unwrap();
        assert_eq!(settings.not_ready_volume, 0.25);
        assert_eq!(settings.not_ready_cue, NOT_READY_CUE);
        assert!(settings.isolate_player_actions);
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join("perkforge_settings_test.ron");
        let settings = AbilitySettings {
            isolate_player_actions: false,
            ..AbilitySettings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(AbilitySettings::load_from(&path), settings);
        let _ = fs::remove_file(&path);
    }
}
