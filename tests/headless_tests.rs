//! Integration tests for headless scenario execution
//!
//! These tests verify that:
//! - Headless scenarios run to completion inside a Bevy app
//! - Scenario results are accessible programmatically
//! - Seeded random presses produce deterministic logs

use perkforge::abilities::ability_config::{AbilityDefinitions, AbilityKind};
use perkforge::abilities::AbilityState;
use perkforge::headless::{run_scenario, HeadlessScenarioConfig, ScenarioResult};
use perkforge::keybindings::GameAction;
use perkforge::log::AbilityLogEventType;

/// Run a scenario at 10 Hz so frame times are exact tenths of a second
fn run(json: &str) -> ScenarioResult {
    let mut config = HeadlessScenarioConfig::from_json(json).expect("valid scenario");
    config.tick_rate_hz = 10.0;
    run_scenario(config, AbilityDefinitions::default()).expect("scenario completes")
}

fn summary(result: &ScenarioResult, player: u32, kind: AbilityKind) -> (AbilityState, f64) {
    result
        .abilities
        .iter()
        .find(|a| a.player == player && a.kind == kind)
        .map(|a| (a.state, a.cooldown_remaining))
        .expect("ability summary present")
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_config_rejects_unknown_collaborator() {
    let json = r#"{"players": [{"id": 0, "devices": ["Keyboard"], "missing_collaborators": ["Jetpack"]}]}"#;
    let err = HeadlessScenarioConfig::from_json(json).unwrap_err();
    assert!(err.contains("Unknown collaborator"));
}

#[test]
fn test_config_parses_every_action() {
    let json = r#"{
        "players": [{"id": 0, "devices": ["Keyboard"]}],
        "duration_secs": 10,
        "steps": [
            {"at": 0.0, "action": "press", "device": "Keyboard", "path": "<Keyboard>/KeyQ"},
            {"at": 1.0, "action": "wave"},
            {"at": 1.0, "action": "break_shield", "player": 0},
            {"at": 2.0, "action": "kill", "player": 0},
            {"at": 3.0, "action": "revive", "player": 0},
            {"at": 4.0, "action": "set_perk", "perk": "barrier", "level": 2},
            {"at": 5.0, "action": "rebind", "player": 0, "ability": "Barrier", "old": "<Keyboard>/KeyQ", "new": "<Keyboard>/KeyF"},
            {"at": 6.0, "action": "reduce_cooldowns", "amount": 5},
            {"at": 7.0, "action": "skip_cooldown", "player": 0, "ability": "barrier"},
            {"at": 8.0, "action": "despawn", "player": 0}
        ]
    }"#;
    let config = HeadlessScenarioConfig::from_json(json).unwrap();
    assert_eq!(config.steps.len(), 10);
}

// =============================================================================
// Scenario Tests
// =============================================================================

#[test]
fn test_press_activates_and_cooldown_survives_to_the_end() {
    let result = run(r#"{
        "players": [{"id": 0, "devices": ["Keyboard"]}],
        "perks": {"barrier": 1},
        "duration_secs": 5,
        "steps": [
            {"at": 0.0, "action": "press", "device": "Keyboard", "path": "<Keyboard>/KeyQ"},
            {"at": 1.0, "action": "press", "device": "Keyboard", "path": "<Keyboard>/KeyR"}
        ]
    }"#);

    assert_eq!(result.activations, 1);
    let (state, remaining) = summary(&result, 0, AbilityKind::Barrier);
    assert_eq!(state, AbilityState::OnCooldown);
    assert!((remaining - 18.0).abs() < 1e-6, "remaining {}", remaining);
    assert_eq!(summary(&result, 0, AbilityKind::Shockwave).0, AbilityState::Locked);
    assert_eq!(result.host_actions, vec![(0, GameAction::Reload)]);
    assert!(result.bindings_restored);
}

#[test]
fn test_shield_break_starts_cooldown_early() {
    let result = run(r#"{
        "players": [{"id": 0, "devices": ["Keyboard"]}],
        "perks": {"barrier": 1},
        "duration_secs": 5,
        "steps": [
            {"at": 0.0, "action": "press", "device": "Keyboard", "path": "<Keyboard>/KeyQ"},
            {"at": 1.0, "action": "break_shield", "player": 0}
        ]
    }"#);

    let (state, remaining) = summary(&result, 0, AbilityKind::Barrier);
    assert_eq!(state, AbilityState::OnCooldown);
    assert!((remaining - 16.0).abs() < 1e-6, "remaining {}", remaining);
}

#[test]
fn test_wave_resets_cooldowns_mid_scenario() {
    let result = run(r#"{
        "players": [{"id": 0, "devices": ["Keyboard"]}],
        "perks": {"shockwave": 1},
        "duration_secs": 3,
        "steps": [
            {"at": 0.0, "action": "press", "device": "Keyboard", "path": "<Keyboard>/KeyV"},
            {"at": 1.0, "action": "wave"},
            {"at": 2.0, "action": "press", "device": "Keyboard", "path": "<Keyboard>/KeyV"}
        ]
    }"#);

    assert_eq!(result.activations, 2);
    assert_eq!(result.rejections, 0);
    // Shockwave shadows Melee, so no host action ever fired
    assert!(result.host_actions.is_empty());
}

#[test]
fn test_dead_player_press_is_rejected() {
    let result = run(r#"{
        "players": [{"id": 0, "devices": ["Keyboard"]}],
        "perks": {"adrenaline": 1},
        "duration_secs": 2,
        "steps": [
            {"at": 0.0, "action": "kill", "player": 0},
            {"at": 0.5, "action": "press", "device": "Keyboard", "path": "<Keyboard>/KeyC"},
            {"at": 1.0, "action": "revive", "player": 0},
            {"at": 1.5, "action": "press", "device": "Keyboard", "path": "<Keyboard>/KeyC"}
        ]
    }"#);

    assert_eq!(result.rejections, 1);
    assert_eq!(result.activations, 1);
    assert_eq!(summary(&result, 0, AbilityKind::Adrenaline).0, AbilityState::Active);
}

#[test]
fn test_missing_collaborator_rejects_in_app() {
    let result = run(r#"{
        "players": [{"id": 0, "devices": ["Keyboard"], "missing_collaborators": ["Weapon"]}],
        "perks": {"resupply": 1},
        "duration_secs": 1,
        "steps": [
            {"at": 0.0, "action": "press", "device": "Keyboard", "path": "<Keyboard>/KeyT"}
        ]
    }"#);

    assert_eq!(result.activations, 0);
    assert_eq!(result.rejections, 1);
    assert_eq!(summary(&result, 0, AbilityKind::Resupply).0, AbilityState::Ready);
}

#[test]
fn test_perk_gained_mid_match_claims_paths() {
    let result = run(r#"{
        "players": [{"id": 0, "devices": ["Keyboard"]}],
        "duration_secs": 3,
        "steps": [
            {"at": 0.0, "action": "press", "device": "Keyboard", "path": "<Keyboard>/KeyV"},
            {"at": 1.0, "action": "set_perk", "perk": "shockwave", "level": 1},
            {"at": 2.0, "action": "press", "device": "Keyboard", "path": "<Keyboard>/KeyV"}
        ]
    }"#);

    // Before the perk, KeyV is still the host's Melee
    assert_eq!(result.host_actions, vec![(0, GameAction::Melee)]);
    assert_eq!(result.activations, 1);
    assert_eq!(summary(&result, 0, AbilityKind::Shockwave).0, AbilityState::OnCooldown);
}

#[test]
fn test_two_local_players_keep_separate_devices() {
    let result = run(r#"{
        "players": [
            {"id": 0, "devices": ["Keyboard"]},
            {"id": 1, "devices": [{"Gamepad": 2}]}
        ],
        "perks": {"barrier": 1},
        "duration_secs": 2,
        "steps": [
            {"at": 0.0, "action": "press", "device": {"Gamepad": 2}, "path": "<Gamepad>/LeftTrigger"}
        ]
    }"#);

    assert_eq!(summary(&result, 0, AbilityKind::Barrier).0, AbilityState::Ready);
    assert_eq!(summary(&result, 1, AbilityKind::Barrier).0, AbilityState::Active);
    assert!(result.bindings_restored);
}

#[test]
fn test_despawn_ends_session_early() {
    let result = run(r#"{
        "players": [{"id": 0, "devices": ["Keyboard"]}, {"id": 1, "devices": ["Mouse"]}],
        "perks": {"barrier": 1},
        "duration_secs": 2,
        "steps": [{"at": 0.5, "action": "despawn", "player": 1}]
    }"#);

    assert!(result.abilities.iter().all(|a| a.player == 0));
    assert!(result.bindings_restored);
    assert!(result
        .log_entries
        .iter()
        .any(|e| e.player == Some(1) && e.event_type == AbilityLogEventType::Binding));
}

#[test]
fn test_seeded_random_presses_are_deterministic() {
    let json = r#"{
        "players": [{"id": 0, "devices": ["Keyboard", {"Gamepad": 1}]}],
        "perks": {"barrier": 1, "shockwave": 1, "resupply": 1, "adrenaline": 1},
        "duration_secs": 20,
        "random_presses": 40,
        "random_seed": 12345
    }"#;

    let first = run(json);
    let second = run(json);
    assert_eq!(first.random_seed, Some(12345));

    let lines = |r: &ScenarioResult| -> Vec<(f64, String)> {
        r.log_entries.iter().map(|e| (e.timestamp, e.message.clone())).collect()
    };
    assert_eq!(lines(&first), lines(&second));
    assert!(first.activations > 0);
}

#[test]
fn test_shared_mode_restores_the_shared_action_set() {
    let result = run(r#"{
        "players": [
            {"id": 0, "devices": ["Keyboard"]},
            {"id": 1, "devices": [{"Gamepad": 2}]}
        ],
        "perks": {"shockwave": 1},
        "duration_secs": 2,
        "isolate_player_actions": false,
        "steps": [
            {"at": 0.0, "action": "press", "device": "Keyboard", "path": "<Keyboard>/KeyV"},
            {"at": 0.5, "action": "despawn", "player": 0},
            {"at": 1.0, "action": "press", "device": {"Gamepad": 2}, "path": "<Gamepad>/RightThumb"}
        ]
    }"#);

    assert_eq!(result.activations, 2);
    assert!(result.host_actions.is_empty());
    assert!(result.bindings_restored);
}
