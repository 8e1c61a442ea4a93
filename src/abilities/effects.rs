//! Per-kind effect hooks
//!
//! The state machine in [`instance`](super::instance) decides *when* an effect
//! starts or stops. These hooks only decide *what* the host is asked to do.
//! They are pure: each returns the request (if any) for the instance to send.

use super::ability_config::{AbilityKind, AbilitySpec};
use super::host::EffectRequest;
use super::modifiers::PerkModifierProvider;
use super::perks::PerkProgressionTable;

/// Ultimate shockwave reaches this much further than the base one
const ULTIMATE_RADIUS_SCALE: f32 = 1.5;

const ADRENALINE_SPEED: f32 = 1.3;
const ADRENALINE_ULTIMATE_SPEED: f32 = 1.6;

/// Read-only inputs available to a hook
pub struct EffectInputs<'a> {
    pub spec: &'a AbilitySpec,
    pub perks: &'a PerkProgressionTable,
}

pub trait AbilityHooks {
    fn on_activate(&self, inputs: &EffectInputs) -> Option<EffectRequest>;
    fn on_deactivate(&self, inputs: &EffectInputs) -> Option<EffectRequest>;
    fn on_activate_ultimate(&self, inputs: &EffectInputs) -> Option<EffectRequest>;
    fn on_deactivate_ultimate(&self, inputs: &EffectInputs) -> Option<EffectRequest>;
}

impl AbilityHooks for AbilityKind {
    fn on_activate(&self, inputs: &EffectInputs) -> Option<EffectRequest> {
        match self {
            AbilityKind::Barrier => Some(EffectRequest::Shield {
                enabled: true,
                reflective: false,
            }),
            AbilityKind::Resupply => Some(EffectRequest::AmmoRefill {
                active: true,
                infinite: false,
            }),
            AbilityKind::Shockwave => Some(EffectRequest::AreaPulse {
                radius: PerkModifierProvider::effective_radius(inputs.spec, inputs.perks),
                stun: false,
            }),
            AbilityKind::Adrenaline => Some(EffectRequest::SpeedBoost {
                multiplier: ADRENALINE_SPEED,
            }),
        }
    }

    fn on_deactivate(&self, _inputs: &EffectInputs) -> Option<EffectRequest> {
        match self {
            AbilityKind::Barrier => Some(EffectRequest::Shield {
                enabled: false,
                reflective: false,
            }),
            AbilityKind::Resupply => Some(EffectRequest::AmmoRefill {
                active: false,
                infinite: false,
            }),
            // One-shot, nothing to undo
            AbilityKind::Shockwave => None,
            AbilityKind::Adrenaline => Some(EffectRequest::SpeedBoost { multiplier: 1.0 }),
        }
    }

    fn on_activate_ultimate(&self, inputs: &EffectInputs) -> Option<EffectRequest> {
        match self {
            AbilityKind::Barrier => Some(EffectRequest::Shield {
                enabled: true,
                reflective: true,
            }),
            AbilityKind::Resupply => Some(EffectRequest::AmmoRefill {
                active: true,
                infinite: true,
            }),
            AbilityKind::Shockwave => Some(EffectRequest::AreaPulse {
                radius: PerkModifierProvider::effective_radius(inputs.spec, inputs.perks)
                    * ULTIMATE_RADIUS_SCALE,
                stun: true,
            }),
            AbilityKind::Adrenaline => Some(EffectRequest::SpeedBoost {
                multiplier: ADRENALINE_ULTIMATE_SPEED,
            }),
        }
    }

    fn on_deactivate_ultimate(&self, inputs: &EffectInputs) -> Option<EffectRequest> {
        self.on_deactivate(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::ability_config::AbilityDefinitions;

    #[test]
    fn test_shockwave_radius_grows_with_upgrade() {
        let defs = AbilityDefinitions::default();
        let spec = defs.get_unchecked(AbilityKind::Shockwave);
        let mut perks = PerkProgressionTable::for_abilities(&defs);

        perks.set_level("shockwave", 1).unwrap();
        let inputs = EffectInputs { spec, perks: &perks };
        let base = AbilityKind::Shockwave.on_activate(&inputs);
        assert_eq!(base, Some(EffectRequest::AreaPulse { radius: 6.0, stun: false }));

        perks.set_level("shockwave", 2).unwrap();
        let inputs = EffectInputs { spec, perks: &perks };
        let upgraded = AbilityKind::Shockwave.on_activate(&inputs);
        assert_eq!(upgraded, Some(EffectRequest::AreaPulse { radius: 8.0, stun: false }));
    }

    #[test]
    fn test_every_sustained_kind_turns_its_effect_off() {
        let defs = AbilityDefinitions::default();
        let perks = PerkProgressionTable::for_abilities(&defs);
        for kind in [AbilityKind::Barrier, AbilityKind::Resupply, AbilityKind::Adrenaline] {
            let inputs = EffectInputs {
                spec: defs.get_unchecked(kind),
                perks: &perks,
            };
            let on = kind.on_activate(&inputs).expect("sustained kinds have an effect");
            let off = kind.on_deactivate(&inputs).expect("sustained kinds undo their effect");
            assert_eq!(on.collaborator(), off.collaborator());
            assert_ne!(on, off);
        }
    }

    #[test]
    fn test_ultimate_barrier_reflects() {
        let defs = AbilityDefinitions::default();
        let perks = PerkProgressionTable::for_abilities(&defs);
        let inputs = EffectInputs {
            spec: defs.get_unchecked(AbilityKind::Barrier),
            perks: &perks,
        };
        assert_eq!(
            AbilityKind::Barrier.on_activate_ultimate(&inputs),
            Some(EffectRequest::Shield {
                enabled: true,
                reflective: true
            })
        );
    }
}
