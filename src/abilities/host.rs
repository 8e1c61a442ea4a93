//! Collaborator interface
//!
//! The ability core never reaches into host internals. Everything it needs
//! from the game (entity lookup, device assignment, effect execution, audio)
//! goes through [`AbilityHost`]. The Bevy glue implements it over ECS queries;
//! [`ScriptedHost`] is an in-memory implementation for tools and tests.

use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::keybindings::InputDevice;

use super::ability_config::AbilityKind;

/// Index of a connected player
pub type PlayerId = u32;

/// Devices assigned to one player
pub type DeviceList = SmallVec<[InputDevice; 4]>;

/// Host system an effect depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    DamageShield,
    Weapon,
    Physics,
    Movement,
}

/// A side effect the core asks the host to perform
#[derive(Debug, Clone, PartialEq)]
pub enum EffectRequest {
    /// Toggle the damage shield on the player's entity
    Shield { enabled: bool, reflective: bool },
    /// Start or stop refilling ammunition
    AmmoRefill { active: bool, infinite: bool },
    /// One-shot knockback around the player
    AreaPulse { radius: f32, stun: bool },
    /// Movement/fire-rate multiplier (1.0 = normal)
    SpeedBoost { multiplier: f32 },
}

impl EffectRequest {
    pub fn collaborator(&self) -> Collaborator {
        match self {
            EffectRequest::Shield { .. } => Collaborator::DamageShield,
            EffectRequest::AmmoRefill { .. } => Collaborator::Weapon,
            EffectRequest::AreaPulse { .. } => Collaborator::Physics,
            EffectRequest::SpeedBoost { .. } => Collaborator::Movement,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HostError {
    #[error("Player {0} has no controlled entity")]
    NoControlledEntity(PlayerId),
    #[error("Player {player} is missing collaborator {collaborator:?}")]
    MissingCollaborator {
        player: PlayerId,
        collaborator: Collaborator,
    },
    #[error("Device enumeration failed for player {player}: {reason}")]
    DeviceEnumeration { player: PlayerId, reason: String },
}

pub trait AbilityHost {
    /// Whether the player's controlled entity exists and is alive
    fn is_alive(&self, player: PlayerId) -> bool;

    /// Devices currently assigned to the player
    fn assigned_devices(&self, player: PlayerId) -> Result<DeviceList, HostError>;

    /// Perform a side effect on the player's entity
    fn apply_effect(&mut self, player: PlayerId, effect: EffectRequest) -> Result<(), HostError>;

    /// Whether a sustained effect is still running on the host side.
    ///
    /// `Some(false)` means the host ended it (e.g. the shield broke);
    /// `None` means the host does not track this kind.
    fn effect_running(&self, player: PlayerId, kind: AbilityKind) -> Option<bool> {
        let _ = (player, kind);
        None
    }

    /// Fire-and-forget audio cue
    fn play_cue(&mut self, cue: &str, volume: f32);
}

/// State of one player inside a [`ScriptedHost`]
#[derive(Debug, Clone)]
pub struct ScriptedPlayer {
    pub alive: bool,
    pub devices: DeviceList,
    pub collaborators: HashSet<Collaborator>,
    pub shield_up: bool,
    pub refilling: bool,
    pub speed_multiplier: f32,
    /// Simulates a device enumeration failure
    pub devices_unavailable: bool,
}

/// In-memory host that records every request it receives
#[derive(Debug, Default)]
pub struct ScriptedHost {
    players: HashMap<PlayerId, ScriptedPlayer>,
    pub effects: Vec<(PlayerId, EffectRequest)>,
    pub cues: Vec<(String, f32)>,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an alive player with every collaborator present
    pub fn add_player(&mut self, player: PlayerId, devices: &[InputDevice]) {
        self.players.insert(
            player,
            ScriptedPlayer {
                alive: true,
                devices: devices.iter().copied().collect(),
                collaborators: [
                    Collaborator::DamageShield,
                    Collaborator::Weapon,
                    Collaborator::Physics,
                    Collaborator::Movement,
                ]
                .into_iter()
                .collect(),
                shield_up: false,
                refilling: false,
                speed_multiplier: 1.0,
                devices_unavailable: false,
            },
        );
    }

    pub fn remove_player(&mut self, player: PlayerId) {
        self.players.remove(&player);
    }

    pub fn player(&self, player: PlayerId) -> Option<&ScriptedPlayer> {
        self.players.get(&player)
    }

    pub fn player_mut(&mut self, player: PlayerId) -> Option<&mut ScriptedPlayer> {
        self.players.get_mut(&player)
    }

    pub fn set_alive(&mut self, player: PlayerId, alive: bool) {
        if let Some(p) = self.players.get_mut(&player) {
            p.alive = alive;
        }
    }

    pub fn remove_collaborator(&mut self, player: PlayerId, collaborator: Collaborator) {
        if let Some(p) = self.players.get_mut(&player) {
            p.collaborators.remove(&collaborator);
        }
    }

    /// Host-side shield break (e.g. from damage)
    pub fn break_shield(&mut self, player: PlayerId) {
        if let Some(p) = self.players.get_mut(&player) {
            p.shield_up = false;
        }
    }

    pub fn cue_count(&self, cue: &str) -> usize {
        self.cues.iter().filter(|(name, _)| name == cue).count()
    }
}

impl AbilityHost for ScriptedHost {
    fn is_alive(&self, player: PlayerId) -> bool {
        self.players.get(&player).is_some_and(|p| p.alive)
    }

    fn assigned_devices(&self, player: PlayerId) -> Result<DeviceList, HostError> {
        let p = self
            .players
            .get(&player)
            .ok_or(HostError::NoControlledEntity(player))?;
        if p.devices_unavailable {
            return Err(HostError::DeviceEnumeration {
                player,
                reason: "device list unavailable".to_string(),
            });
        }
        Ok(p.devices.clone())
    }

    fn apply_effect(&mut self, player: PlayerId, effect: EffectRequest) -> Result<(), HostError> {
        let p = self
            .players
            .get_mut(&player)
            .ok_or(HostError::NoControlledEntity(player))?;
        let collaborator = effect.collaborator();
        if !p.collaborators.contains(&collaborator) {
            return Err(HostError::MissingCollaborator { player, collaborator });
        }
        match &effect {
            EffectRequest::Shield { enabled, .. } => p.shield_up = *enabled,
            EffectRequest::AmmoRefill { active, .. } => p.refilling = *active,
            EffectRequest::SpeedBoost { multiplier } => p.speed_multiplier = *multiplier,
            EffectRequest::AreaPulse { .. } => {}
        }
        self.effects.push((player, effect));
        Ok(())
    }

    fn effect_running(&self, player: PlayerId, kind: AbilityKind) -> Option<bool> {
        match kind {
            AbilityKind::Barrier => self.players.get(&player).map(|p| p.shield_up),
            _ => None,
        }
    }

    fn play_cue(&mut self, cue: &str, volume: f32) {
        self.cues.push((cue.to_string(), volume));
    }
}
