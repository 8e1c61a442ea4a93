//! Perk Modifier Provider
//!
//! Pure functions turning an ability spec plus the shared perk table into the
//! effective numbers used at activation time. Always queried fresh: perks can
//! be gained mid-match, so nothing here is cached.
//!
//! ```text
//! effective = base
//!           + sign * delta   if own perk level >= upgrade tier
//!           ± sign * delta   short-term investment (+ for base, - for ultimate)
//!           ∓ sign * delta   long-term investment  (- for base, + for ultimate)
//! clamped to MIN_EFFECTIVE_VALUE
//! ```
//!
//! `sign` is +1 for durations (longer is better) and -1 for cooldowns.

use super::ability_config::{AbilitySpec, AbilityVariant};
use super::constants::MIN_EFFECTIVE_VALUE;
use super::perks::PerkProgressionTable;

/// Which number is being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stat {
    Duration,
    Cooldown,
}

impl Stat {
    fn sign(self) -> f32 {
        match self {
            Stat::Duration => 1.0,
            Stat::Cooldown => -1.0,
        }
    }
}

/// Inputs read from the progression table for one resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifierInputs {
    pub perk_level: u8,
    pub short_term: bool,
    pub long_term: bool,
}

impl ModifierInputs {
    pub fn read(perks: &PerkProgressionTable, spec: &AbilitySpec, variant: AbilityVariant) -> Self {
        let perk_level = match variant {
            AbilityVariant::Base => perks.level(&spec.perk_key),
            AbilityVariant::Ultimate => perks.level(&spec.ultimate_key()),
        };
        Self {
            perk_level,
            short_term: perks.short_term_investment(),
            long_term: perks.long_term_investment(),
        }
    }
}

/// Shared shape of every duration/cooldown resolution.
///
/// Investment perks push base abilities one way and ultimates the other.
pub fn apply_modifiers(
    base: f32,
    delta: f32,
    upgrade_tier: u8,
    inputs: ModifierInputs,
    variant: AbilityVariant,
    sign: f32,
) -> f32 {
    let investment_sign = match variant {
        AbilityVariant::Base => 1.0,
        AbilityVariant::Ultimate => -1.0,
    };

    let mut effective = base;
    if inputs.perk_level >= upgrade_tier {
        effective += sign * delta;
    }
    if inputs.short_term {
        effective += investment_sign * sign * delta;
    }
    if inputs.long_term {
        effective -= investment_sign * sign * delta;
    }
    effective.max(MIN_EFFECTIVE_VALUE)
}

pub struct PerkModifierProvider;

impl PerkModifierProvider {
    /// Seconds the ability stays active. Instant abilities always resolve to 0.
    pub fn effective_duration(
        spec: &AbilitySpec,
        perks: &PerkProgressionTable,
        variant: AbilityVariant,
    ) -> f32 {
        if spec.is_instant(variant) {
            return 0.0;
        }
        Self::resolve(spec, perks, variant, Stat::Duration)
    }

    pub fn effective_cooldown(
        spec: &AbilitySpec,
        perks: &PerkProgressionTable,
        variant: AbilityVariant,
    ) -> f32 {
        Self::resolve(spec, perks, variant, Stat::Cooldown)
    }

    /// Area radius. Only the ability's own upgrade tier applies.
    pub fn effective_radius(spec: &AbilitySpec, perks: &PerkProgressionTable) -> f32 {
        let mut radius = spec.base_radius;
        if perks.level(&spec.perk_key) >= spec.upgrade_tier {
            radius += spec.radius_delta;
        }
        radius.max(MIN_EFFECTIVE_VALUE)
    }

    fn resolve(
        spec: &AbilitySpec,
        perks: &PerkProgressionTable,
        variant: AbilityVariant,
        stat: Stat,
    ) -> f32 {
        let (base, delta) = match (variant, stat) {
            (AbilityVariant::Base, Stat::Duration) => (spec.base_duration, spec.duration_delta),
            (AbilityVariant::Base, Stat::Cooldown) => (spec.base_cooldown, spec.cooldown_delta),
            (AbilityVariant::Ultimate, Stat::Duration) => {
                (spec.ultimate_duration, spec.ultimate_duration_delta)
            }
            (AbilityVariant::Ultimate, Stat::Cooldown) => {
                (spec.ultimate_cooldown, spec.ultimate_cooldown_delta)
            }
        };
        let inputs = ModifierInputs::read(perks, spec, variant);
        apply_modifiers(base, delta, spec.upgrade_tier, inputs, variant, stat.sign())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(perk_level: u8, short_term: bool, long_term: bool) -> ModifierInputs {
        ModifierInputs {
            perk_level,
            short_term,
            long_term,
        }
    }

    #[test]
    fn test_no_modifiers_returns_base() {
        let value = apply_modifiers(3.0, 1.0, 2, inputs(1, false, false), AbilityVariant::Base, 1.0);
        assert_eq!(value, 3.0);
    }

    #[test]
    fn test_upgrade_tier_applies_delta() {
        let duration = apply_modifiers(3.0, 1.0, 2, inputs(2, false, false), AbilityVariant::Base, 1.0);
        let cooldown = apply_modifiers(20.0, 2.0, 2, inputs(2, false, false), AbilityVariant::Base, -1.0);
        assert_eq!(duration, 4.0);
        assert_eq!(cooldown, 18.0);
    }

    #[test]
    fn test_short_term_favors_base() {
        let base = apply_modifiers(3.0, 1.0, 2, inputs(1, true, false), AbilityVariant::Base, 1.0);
        let ult = apply_modifiers(5.0, 1.0, 2, inputs(1, true, false), AbilityVariant::Ultimate, 1.0);
        assert_eq!(base, 4.0);
        assert_eq!(ult, 4.0);
    }

    #[test]
    fn test_long_term_favors_ultimate_cooldown() {
        let base = apply_modifiers(20.0, 2.0, 2, inputs(1, false, true), AbilityVariant::Base, -1.0);
        let ult = apply_modifiers(40.0, 2.0, 2, inputs(1, false, true), AbilityVariant::Ultimate, -1.0);
        assert_eq!(base, 22.0);
        assert_eq!(ult, 38.0);
    }

    #[test]
    fn test_both_investments_cancel() {
        let value = apply_modifiers(3.0, 1.0, 2, inputs(1, true, true), AbilityVariant::Base, 1.0);
        assert_eq!(value, 3.0);
    }

    #[test]
    fn test_clamped_to_minimum() {
        let value = apply_modifiers(1.0, 5.0, 2, inputs(2, false, false), AbilityVariant::Base, -1.0);
        assert_eq!(value, MIN_EFFECTIVE_VALUE);
    }
}
