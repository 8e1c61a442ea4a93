//! Ability events
//!
//! Every lifecycle transition and binding change is reported as an
//! [`AbilityEvent`]. Sessions buffer them; the Bevy glue republishes them and
//! records them in the [`AbilityLog`](crate::log::AbilityLog).

use bevy::prelude::*;

use crate::keybindings::ControlPath;

use super::ability_config::{AbilityKind, AbilityVariant};
use super::host::PlayerId;

/// Why an activation attempt was a no-op
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    Locked,
    UltimateLocked,
    Dead,
    AlreadyActive,
    OnCooldown,
    MissingCollaborator,
    TornDown,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Locked => "locked",
            RejectReason::UltimateLocked => "ultimate locked",
            RejectReason::Dead => "player dead",
            RejectReason::AlreadyActive => "already active",
            RejectReason::OnCooldown => "on cooldown",
            RejectReason::MissingCollaborator => "missing collaborator",
            RejectReason::TornDown => "torn down",
        }
    }
}

/// What ended an active ability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeactivationCause {
    /// The duration timer elapsed
    Expired,
    /// Instant ability, ended right after its effect
    Instant,
    /// Ended early by the host (shield broken, explicit call)
    External,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AbilityEventKind {
    Activated { variant: AbilityVariant, duration: f32 },
    Deactivated { variant: AbilityVariant, cause: DeactivationCause },
    CooldownStarted { variant: AbilityVariant, cooldown: f32 },
    /// Cooldown skipped by the one-shot override
    CooldownSkipped,
    /// Cooldown cleared by a mass reset
    CooldownReset,
    CooldownReduced { remaining: f64 },
    Ready,
    Rejected { variant: AbilityVariant, reason: RejectReason },
    BindingClaimed { variant: AbilityVariant, path: ControlPath },
    BindingReleased { path: ControlPath },
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct AbilityEvent {
    pub player: PlayerId,
    pub kind: AbilityKind,
    /// Real-time seconds
    pub at: f64,
    pub detail: AbilityEventKind,
}

impl AbilityEvent {
    pub fn describe(&self) -> String {
        let who = format!("Player {} {}", self.player, self.kind.name());
        match &self.detail {
            AbilityEventKind::Activated { variant, duration } => match variant {
                AbilityVariant::Base => format!("{} activated ({:.1}s)", who, duration),
                AbilityVariant::Ultimate => format!("{} ULTIMATE activated ({:.1}s)", who, duration),
            },
            AbilityEventKind::Deactivated { cause, .. } => format!("{} ended ({:?})", who, cause),
            AbilityEventKind::CooldownStarted { cooldown, .. } => {
                format!("{} cooling down ({:.1}s)", who, cooldown)
            }
            AbilityEventKind::CooldownSkipped => format!("{} skipped its cooldown", who),
            AbilityEventKind::CooldownReset => format!("{} cooldown reset", who),
            AbilityEventKind::CooldownReduced { remaining } => {
                format!("{} cooldown reduced to {:.1}s", who, remaining)
            }
            AbilityEventKind::Ready => format!("{} ready", who),
            AbilityEventKind::Rejected { reason, .. } => {
                format!("{} rejected: {}", who, reason.as_str())
            }
            AbilityEventKind::BindingClaimed { path, .. } => format!("{} claimed {}", who, path),
            AbilityEventKind::BindingReleased { path } => format!("{} released {}", who, path),
        }
    }
}
