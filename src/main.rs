//! perkforge - per-player ability engine
//!
//! Without arguments, prints the effective duration, cooldown and radius of
//! every ability at each perk level. With `--headless`, runs a scripted
//! scenario and prints its summary.

use std::path::Path;

use perkforge::abilities::ability_config::{load_ability_definitions_from, AbilityDefinitions, AbilityVariant};
use perkforge::abilities::constants::{ABILITY_PERK_MAX_LEVEL, LONG_TERM_INVESTMENT, SHORT_TERM_INVESTMENT};
use perkforge::abilities::{PerkModifierProvider, PerkProgressionTable};
use perkforge::cli::{parse_args, Args};
use perkforge::headless::{run_headless_scenario, HeadlessScenarioConfig, ScenarioResult};

fn main() {
    let args = parse_args();

    let definitions = match load_ability_definitions_from(&args.definitions) {
        Ok(definitions) => definitions,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match &args.headless {
        Some(path) => {
            if let Err(e) = run_headless(path, &args, definitions) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        None => print_ability_table(&definitions),
    }
}

fn run_headless(path: &Path, args: &Args, definitions: AbilityDefinitions) -> Result<(), String> {
    let mut config = HeadlessScenarioConfig::load_from_file(path)?;
    if let Some(output) = &args.output {
        config.output_path = Some(output.to_string_lossy().into_owned());
    }
    if let Some(duration) = args.duration {
        config.duration_secs = duration;
    }
    if let Some(seed) = args.seed {
        config.random_seed = Some(seed);
    }

    let result = run_headless_scenario(config, definitions)?;
    print_summary(&result);
    Ok(())
}

fn print_summary(result: &ScenarioResult) {
    println!();
    println!("Scenario finished after {:.2}s ({} frames)", result.elapsed, result.frames);
    if let Some(seed) = result.random_seed {
        println!("  Random seed: {}", seed);
    }
    println!("  Activations: {}", result.activations);
    println!("  Rejections: {}", result.rejections);
    println!("  Host actions: {}", result.host_actions.len());
    println!("  Cues played: {}", result.cues_played.len());
    println!("  Bindings restored: {}", result.bindings_restored);
    for ability in &result.abilities {
        println!(
            "  Player {} {:<10} {:?} (cooldown {:.2}s)",
            ability.player,
            ability.kind.name(),
            ability.state,
            ability.cooldown_remaining
        );
    }
    if let Some(path) = &result.log_path {
        println!("  Log: {}", path);
    }
}

fn print_ability_table(definitions: &AbilityDefinitions) {
    println!(
        "{:<10} {:<8} {:>5} {:>6} {:>9} {:>9} {:>7}",
        "Ability", "Variant", "Level", "Invest", "Duration", "Cooldown", "Radius"
    );
    for kind in definitions.kinds() {
        let Some(spec) = definitions.get(kind) else {
            continue;
        };
        for variant in [AbilityVariant::Base, AbilityVariant::Ultimate] {
            if variant == AbilityVariant::Ultimate && !spec.has_ultimate() {
                continue;
            }
            for level in 1..=ABILITY_PERK_MAX_LEVEL {
                for (label, short_term, long_term) in [("-", false, false), ("short", true, false), ("long", false, true)] {
                    let perks = match table_perks(definitions, &spec.perk_key, &spec.ultimate_key(), variant, level, short_term, long_term) {
                        Ok(perks) => perks,
                        Err(e) => {
                            eprintln!("Skipping {} level {}: {}", kind.name(), level, e);
                            continue;
                        }
                    };
                    println!(
                        "{:<10} {:<8} {:>5} {:>6} {:>8.1}s {:>8.1}s {:>7.1}",
                        kind.name(),
                        format!("{:?}", variant),
                        level,
                        label,
                        PerkModifierProvider::effective_duration(spec, &perks, variant),
                        PerkModifierProvider::effective_cooldown(spec, &perks, variant),
                        PerkModifierProvider::effective_radius(spec, &perks),
                    );
                }
            }
        }
    }
}

fn table_perks(
    definitions: &AbilityDefinitions,
    perk_key: &str,
    ultimate_key: &str,
    variant: AbilityVariant,
    level: u8,
    short_term: bool,
    long_term: bool,
) -> Result<PerkProgressionTable, String> {
    let mut perks = PerkProgressionTable::for_abilities(definitions);
    match variant {
        AbilityVariant::Base => perks.set_level(perk_key, level),
        AbilityVariant::Ultimate => perks
            .set_level(perk_key, 1)
            .and_then(|_| perks.set_level(ultimate_key, level)),
    }
    .map_err(|e| e.to_string())?;
    perks
        .set_level(SHORT_TERM_INVESTMENT, u8::from(short_term))
        .and_then(|_| perks.set_level(LONG_TERM_INVESTMENT, u8::from(long_term)))
        .map_err(|e| e.to_string())?;
    Ok(perks)
}
