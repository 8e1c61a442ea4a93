//! Ability engine
//!
//! Per-player ability lifecycles (Locked → Ready → Active → OnCooldown),
//! perk-driven duration/cooldown modifiers, and input binding interception.
//!
//! The core (`instance`, `binding`, `session`, `modifiers`, `perks`) is plain
//! Rust and talks to the game only through [`host::AbilityHost`]; `systems`
//! plugs it into a Bevy `App`.

pub mod ability_config;
pub mod binding;
pub mod constants;
pub mod cues;
pub mod effects;
pub mod events;
pub mod host;
pub mod instance;
pub mod modifiers;
pub mod perks;
pub mod session;
pub mod systems;
pub mod timers;

pub use ability_config::{AbilityDefinitions, AbilityKind, AbilitySpec, AbilityVariant};
pub use binding::{AbilityTrigger, BindingError, BindingRegistry};
pub use events::{AbilityEvent, AbilityEventKind, DeactivationCause, RejectReason};
pub use host::{AbilityHost, EffectRequest, HostError, PlayerId, ScriptedHost};
pub use instance::{AbilityContext, AbilityInstance, AbilityState, Frame};
pub use modifiers::PerkModifierProvider;
pub use perks::{PerkError, PerkProgressionTable};
pub use session::{AbilitySessions, PlayerAbilitySession};
pub use systems::{AbilityPlugin, AbilitySystemPhase};
