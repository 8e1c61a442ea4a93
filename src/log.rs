//! Ability logging
//!
//! Records every ability event for post-match analysis and headless output.

use bevy::prelude::*;
use std::fmt::Write as _;

use crate::abilities::events::{AbilityEvent, AbilityEventKind};
use crate::abilities::host::PlayerId;

/// A single entry in the ability log
#[derive(Debug, Clone)]
pub struct AbilityLogEntry {
    /// Real-time seconds the event happened at
    pub timestamp: f64,
    pub player: Option<PlayerId>,
    /// The type of event
    pub event_type: AbilityLogEventType,
    /// Human-readable description of the event
    pub message: String,
}

/// Types of ability log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityLogEventType {
    /// Base or ultimate activated
    Activation,
    /// Active ability ended
    Deactivation,
    /// Cooldown started, skipped, reset, reduced or finished
    Cooldown,
    /// Activation attempt was a no-op
    Rejection,
    /// Control path claimed or released
    Binding,
    /// Match event (start, wave, end)
    MatchEvent,
}

impl AbilityLogEventType {
    pub fn of(kind: &AbilityEventKind) -> Self {
        match kind {
            AbilityEventKind::Activated { .. } => AbilityLogEventType::Activation,
            AbilityEventKind::Deactivated { .. } => AbilityLogEventType::Deactivation,
            AbilityEventKind::CooldownStarted { .. }
            | AbilityEventKind::CooldownSkipped
            | AbilityEventKind::CooldownReset
            | AbilityEventKind::CooldownReduced { .. }
            | AbilityEventKind::Ready => AbilityLogEventType::Cooldown,
            AbilityEventKind::Rejected { .. } => AbilityLogEventType::Rejection,
            AbilityEventKind::BindingClaimed { .. } | AbilityEventKind::BindingReleased { .. } => {
                AbilityLogEventType::Binding
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AbilityLogEventType::Activation => "ACTIVATE",
            AbilityLogEventType::Deactivation => "END",
            AbilityLogEventType::Cooldown => "COOLDOWN",
            AbilityLogEventType::Rejection => "REJECT",
            AbilityLogEventType::Binding => "BINDING",
            AbilityLogEventType::MatchEvent => "MATCH",
        }
    }
}

/// The ability log resource storing all events
#[derive(Resource, Default, Debug)]
pub struct AbilityLog {
    /// All log entries in chronological order
    pub entries: Vec<AbilityLogEntry>,
}

impl AbilityLog {
    /// Clear the log for a new match
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Add a new entry to the log
    pub fn log(
        &mut self,
        timestamp: f64,
        player: Option<PlayerId>,
        event_type: AbilityLogEventType,
        message: String,
    ) {
        self.entries.push(AbilityLogEntry {
            timestamp,
            player,
            event_type,
            message,
        });
    }

    /// Add an entry for an ability event
    pub fn record(&mut self, event: &AbilityEvent) {
        self.log(
            event.at,
            Some(event.player),
            AbilityLogEventType::of(&event.detail),
            event.describe(),
        );
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: AbilityLogEventType) -> Vec<&AbilityLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    pub fn for_player(&self, player: PlayerId) -> Vec<&AbilityLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.player == Some(player))
            .collect()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&AbilityLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    /// Render the log as text, one `[  12.30s] TYPE message` line per entry
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = writeln!(
                out,
                "[{:>7.2}s] {:<9} {}",
                entry.timestamp,
                entry.event_type.label(),
                entry.message
            );
        }
        out
    }

    /// Save the log to a file and return the path written
    pub fn save_to_file(&self, output_path: Option<&str>) -> Result<String, String> {
        let filename = match output_path {
            Some(path) => path.to_string(),
            None => {
                let stamp = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default();
                format!("ability_logs/scenario_{}.txt", stamp)
            }
        };
        if let Some(parent) = std::path::Path::new(&filename).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Failed to create log directory: {}", e))?;
            }
        }
        std::fs::write(&filename, self.render())
            .map_err(|e| format!("Failed to write ability log: {}", e))?;
        Ok(filename)
    }
}
