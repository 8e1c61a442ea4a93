//! Headless mode for scripted ability scenarios
//!
//! Runs ability scenarios without any graphical output, suitable for automated
//! testing and replaying bug reports.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- --headless scenario.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "players": [{"id": 0, "devices": ["Keyboard"], "grants": ["Barrier"]}],
//!   "perks": {"barrier": 1},
//!   "steps": [
//!     {"at": 0.0, "action": "press", "device": "Keyboard", "path": "<Keyboard>/KeyQ"},
//!     {"at": 1.0, "action": "break_shield", "player": 0},
//!     {"at": 5.0, "action": "wave"}
//!   ],
//!   "duration_secs": 30
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::{HeadlessScenarioConfig, ScenarioAction, ScenarioPlayer, ScenarioStep};
pub use runner::{run_headless_scenario, run_scenario, AbilitySummary, ScenarioResult};
