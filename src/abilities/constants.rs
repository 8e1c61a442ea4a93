//! Ability Constants
//!
//! Centralized tuning numbers shared by the ability lifecycle.

// ============================================================================
// Modifiers
// ============================================================================

/// Effective durations, cooldowns and radii never go below this value.
pub const MIN_EFFECTIVE_VALUE: f32 = 0.1;

/// Perk level at which per-level deltas start to apply, unless the ability definition overrides it.
pub const DEFAULT_UPGRADE_TIER: u8 = 2;

/// Highest level an ability perk can reach.
pub const ABILITY_PERK_MAX_LEVEL: u8 = 2;

// ============================================================================
// Perk keys
// ============================================================================

/// Boosts base abilities at the expense of ultimates.
pub const SHORT_TERM_INVESTMENT: &str = "short_term_investment";

/// Boosts ultimates at the expense of base abilities.
pub const LONG_TERM_INVESTMENT: &str = "long_term_investment";

// ============================================================================
// Audio
// ============================================================================

/// Minimum real-time seconds between two "not ready" cues for one player.
pub const NOT_READY_CUE_INTERVAL: f64 = 1.0;

/// Cue played when a player presses an ability that is on cooldown.
pub const NOT_READY_CUE: &str = "ability_not_ready";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_effective_value_is_positive() {
        assert!(MIN_EFFECTIVE_VALUE > 0.0);
    }

    #[test]
    fn test_upgrade_tier_within_perk_levels() {
        assert!(DEFAULT_UPGRADE_TIER >= 1);
        assert!(DEFAULT_UPGRADE_TIER <= ABILITY_PERK_MAX_LEVEL);
    }

    #[test]
    fn test_investment_keys_are_distinct() {
        assert_ne!(SHORT_TERM_INVESTMENT, LONG_TERM_INVESTMENT);
    }
}
