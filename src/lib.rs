//! perkforge - per-player ability engine
//!
//! Ability lifecycles (Locked, Ready, Active, OnCooldown) driven by perk
//! levels, with input binding interception so an ability's controls never
//! also fire the host's own actions.
//!
//! This library exposes the engine core, its Bevy plugin and the headless
//! scenario runner for testing and reuse.

pub mod abilities;
pub mod cli;
pub mod headless;
pub mod keybindings;
pub mod log;
pub mod settings;

// Re-export commonly used types
pub use abilities::{AbilityPlugin, AbilitySessions, PlayerAbilitySession};
pub use headless::HeadlessScenarioConfig;
pub use log::{AbilityLog, AbilityLogEventType};
