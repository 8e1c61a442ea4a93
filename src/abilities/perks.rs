//! Perk Progression
//!
//! One table per match, shared by every player. Abilities only read it; the
//! perk-granting flow writes it between activations on the same thread.
//!
//! Invariant: a perk can only hold a non-zero level while every one of its
//! prerequisites holds a non-zero level. `set_level` refuses to break it and
//! `revoke` cascades to dependents.

use bevy::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

use super::ability_config::AbilityDefinitions;
use super::constants::{ABILITY_PERK_MAX_LEVEL, LONG_TERM_INVESTMENT, SHORT_TERM_INVESTMENT};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PerkError {
    #[error("Unknown perk: {0}")]
    UnknownPerk(String),
    #[error("Perk {key} cannot reach level {level} (max {max})")]
    AboveMax { key: String, level: u8, max: u8 },
    #[error("Perk {key} requires {prerequisite} first")]
    MissingPrerequisite { key: String, prerequisite: String },
}

/// Declared shape and current level of one perk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerkEntry {
    pub level: u8,
    pub max_level: u8,
    pub prerequisites: Vec<String>,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct PerkProgressionTable {
    perks: HashMap<String, PerkEntry>,
}

impl PerkProgressionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare every ability perk, its ultimate perk and both investment perks.
    pub fn for_abilities(definitions: &AbilityDefinitions) -> Self {
        let mut table = Self::new();
        for kind in definitions.kinds() {
            let spec = definitions.get_unchecked(kind);
            table.declare(&spec.perk_key, ABILITY_PERK_MAX_LEVEL, &[]);
            if spec.has_ultimate() {
                table.declare(&spec.ultimate_key(), ABILITY_PERK_MAX_LEVEL, &[spec.perk_key.as_str()]);
            }
        }
        table.declare(SHORT_TERM_INVESTMENT, 1, &[]);
        table.declare(LONG_TERM_INVESTMENT, 1, &[]);
        table
    }

    /// Declare (or redeclare) a perk at level 0.
    pub fn declare(&mut self, key: &str, max_level: u8, prerequisites: &[&str]) {
        self.perks.insert(
            key.to_string(),
            PerkEntry {
                level: 0,
                max_level,
                prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
            },
        );
    }

    /// Current level; undeclared perks read as 0.
    pub fn level(&self, key: &str) -> u8 {
        self.perks.get(key).map_or(0, |p| p.level)
    }

    pub fn entry(&self, key: &str) -> Option<&PerkEntry> {
        self.perks.get(key)
    }

    pub fn is_unlocked(&self, key: &str) -> bool {
        self.level(key) > 0
    }

    pub fn set_level(&mut self, key: &str, level: u8) -> Result<(), PerkError> {
        let entry = self
            .perks
            .get(key)
            .ok_or_else(|| PerkError::UnknownPerk(key.to_string()))?;

        if level > entry.max_level {
            return Err(PerkError::AboveMax {
                key: key.to_string(),
                level,
                max: entry.max_level,
            });
        }
        if level == 0 {
            self.revoke(key);
            return Ok(());
        }
        if let Some(missing) = entry.prerequisites.iter().find(|p| self.level(p) == 0) {
            return Err(PerkError::MissingPrerequisite {
                key: key.to_string(),
                prerequisite: missing.clone(),
            });
        }

        if let Some(entry) = self.perks.get_mut(key) {
            entry.level = level;
        }
        debug!("Perk {} set to level {}", key, level);
        Ok(())
    }

    /// Raise a perk by one level and return the new level.
    pub fn level_up(&mut self, key: &str) -> Result<u8, PerkError> {
        let next = self.level(key).saturating_add(1);
        self.set_level(key, next)?;
        Ok(next)
    }

    /// Drop a perk to level 0, along with every perk that depends on it.
    pub fn revoke(&mut self, key: &str) {
        let mut pending = vec![key.to_string()];
        while let Some(current) = pending.pop() {
            if let Some(entry) = self.perks.get_mut(&current) {
                if entry.level == 0 && current != key {
                    continue;
                }
                entry.level = 0;
            }
            for (dependent, entry) in &self.perks {
                if entry.level > 0 && entry.prerequisites.iter().any(|p| *p == current) {
                    pending.push(dependent.clone());
                }
            }
        }
    }

    /// Reset every perk to level 0 (match end). Declarations are kept.
    pub fn clear(&mut self) {
        for entry in self.perks.values_mut() {
            entry.level = 0;
        }
    }

    pub fn short_term_investment(&self) -> bool {
        self.is_unlocked(SHORT_TERM_INVESTMENT)
    }

    pub fn long_term_investment(&self) -> bool {
        self.is_unlocked(LONG_TERM_INVESTMENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PerkProgressionTable {
        let mut table = PerkProgressionTable::new();
        table.declare("barrier", 2, &[]);
        table.declare("barrier_ultimate", 2, &["barrier"]);
        table.declare("aegis_overcharge", 1, &["barrier_ultimate"]);
        table
    }

    #[test]
    fn test_unknown_perk_reads_zero() {
        assert_eq!(table().level("nope"), 0);
    }

    #[test]
    fn test_set_level_rejects_unknown_and_above_max() {
        let mut table = table();
        assert_eq!(
            table.set_level("nope", 1),
            Err(PerkError::UnknownPerk("nope".to_string()))
        );
        assert!(matches!(
            table.set_level("barrier", 3),
            Err(PerkError::AboveMax { max: 2, .. })
        ));
    }

    #[test]
    fn test_prerequisite_required_before_unlock() {
        let mut table = table();
        assert!(matches!(
            table.set_level("barrier_ultimate", 1),
            Err(PerkError::MissingPrerequisite { .. })
        ));
        table.set_level("barrier", 1).unwrap();
        table.set_level("barrier_ultimate", 1).unwrap();
        assert!(table.is_unlocked("barrier_ultimate"));
    }

    #[test]
    fn test_level_up_walks_levels() {
        let mut table = table();
        assert_eq!(table.level_up("barrier"), Ok(1));
        assert_eq!(table.level_up("barrier"), Ok(2));
        assert!(table.level_up("barrier").is_err());
        assert_eq!(table.level("barrier"), 2);
    }

    #[test]
    fn test_revoke_cascades_to_dependents() {
        let mut table = table();
        table.set_level("barrier", 2).unwrap();
        table.set_level("barrier_ultimate", 1).unwrap();
        table.set_level("aegis_overcharge", 1).unwrap();

        table.set_level("barrier", 0).unwrap();

        assert_eq!(table.level("barrier"), 0);
        assert_eq!(table.level("barrier_ultimate"), 0);
        assert_eq!(table.level("aegis_overcharge"), 0);
    }

    #[test]
    fn test_clear_keeps_declarations() {
        let mut table = table();
        table.set_level("barrier", 1).unwrap();
        table.clear();
        assert_eq!(table.level("barrier"), 0);
        assert!(table.entry("barrier").is_some());
        assert!(table.set_level("barrier", 1).is_ok());
    }

    #[test]
    fn test_investment_flags() {
        let mut table = PerkProgressionTable::new();
        table.declare(SHORT_TERM_INVESTMENT, 1, &[]);
        table.declare(LONG_TERM_INVESTMENT, 1, &[]);
        assert!(!table.short_term_investment());
        table.set_level(SHORT_TERM_INVESTMENT, 1).unwrap();
        assert!(table.short_term_investment());
        assert!(!table.long_term_investment());
    }

    #[test]
    fn test_for_abilities_declares_ultimate_with_prerequisite() {
        let defs = AbilityDefinitions::default();
        let table = PerkProgressionTable::for_abilities(&defs);
        let entry = table.entry("barrier_ultimate").expect("ultimate perk declared");
        assert_eq!(entry.prerequisites, vec!["barrier".to_string()]);
        assert!(table.entry(SHORT_TERM_INVESTMENT).is_some());
        assert!(table.entry(LONG_TERM_INVESTMENT).is_some());
    }
}
