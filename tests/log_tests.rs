//! Unit tests for ability log rendering and queries
//!
//! These tests verify that the AbilityLog correctly:
//! - Classifies every ability event
//! - Renders one fixed-format line per entry
//! - Writes the rendered log to disk

use regex::Regex;

use perkforge::abilities::ability_config::{AbilityKind, AbilityVariant};
use perkforge::abilities::{AbilityEvent, AbilityEventKind, DeactivationCause, RejectReason};
use perkforge::keybindings::ControlPath;
use perkforge::log::{AbilityLog, AbilityLogEventType};

fn event(player: u32, at: f64, detail: AbilityEventKind) -> AbilityEvent {
    AbilityEvent {
        player,
        kind: AbilityKind::Shockwave,
        at,
        detail,
    }
}

fn sample_log() -> AbilityLog {
    let mut log = AbilityLog::default();
    log.log(0.0, None, AbilityLogEventType::MatchEvent, "Scenario started".to_string());
    log.record(&event(
        0,
        0.0,
        AbilityEventKind::BindingClaimed {
            variant: AbilityVariant::Base,
            path: ControlPath::new("<Keyboard>/KeyV"),
        },
    ));
    log.record(&event(
        0,
        1.5,
        AbilityEventKind::Activated {
            variant: AbilityVariant::Base,
            duration: 0.0,
        },
    ));
    log.record(&event(
        0,
        1.5,
        AbilityEventKind::Deactivated {
            variant: AbilityVariant::Base,
            cause: DeactivationCause::Instant,
        },
    ));
    log.record(&event(
        0,
        1.5,
        AbilityEventKind::CooldownStarted {
            variant: AbilityVariant::Base,
            cooldown: 15.0,
        },
    ));
    log.record(&event(
        1,
        2.25,
        AbilityEventKind::Rejected {
            variant: AbilityVariant::Ultimate,
            reason: RejectReason::OnCooldown,
        },
    ));
    log.record(&event(0, 16.5, AbilityEventKind::Ready));
    log
}

// =============================================================================
// Classification Tests
// =============================================================================

#[test]
fn test_every_event_kind_is_classified() {
    let log = sample_log();
    assert_eq!(log.filter_by_type(AbilityLogEventType::MatchEvent).len(), 1);
    assert_eq!(log.filter_by_type(AbilityLogEventType::Binding).len(), 1);
    assert_eq!(log.filter_by_type(AbilityLogEventType::Activation).len(), 1);
    assert_eq!(log.filter_by_type(AbilityLogEventType::Deactivation).len(), 1);
    assert_eq!(log.filter_by_type(AbilityLogEventType::Cooldown).len(), 2);
    assert_eq!(log.filter_by_type(AbilityLogEventType::Rejection).len(), 1);
}

#[test]
fn test_for_player_excludes_match_events() {
    let log = sample_log();
    assert_eq!(log.for_player(0).len(), 5);
    assert_eq!(log.for_player(1).len(), 1);
}

// =============================================================================
// Rendering Tests
// =============================================================================

#[test]
fn test_render_line_format() {
    let log = sample_log();
    let rendered = log.render();
    let line = Regex::new(r"^\[\s*\d+\.\d{2}s\] [A-Z]+\s+\S.*$").unwrap();

    assert_eq!(rendered.lines().count(), log.entries.len());
    for text in rendered.lines() {
        assert!(line.is_match(text), "unexpected log line: {:?}", text);
    }
}

#[test]
fn test_render_describes_events() {
    let rendered = sample_log().render();
    let rejection = Regex::new(r"\[\s*2\.25s\] REJECT\s+Player 1 Shockwave rejected: ").unwrap();
    assert!(rejection.is_match(&rendered));
    assert!(rendered.contains("claimed <Keyboard>/KeyV"));
    assert!(rendered.contains("cooling down (15.0s)"));
}

#[test]
fn test_save_to_file_writes_rendered_log() {
    let log = sample_log();
    let path = std::env::temp_dir().join(format!("perkforge_log_test_{}.txt", std::process::id()));
    let path_str = path.to_string_lossy().into_owned();

    let written = log.save_to_file(Some(&path_str)).unwrap();
    assert_eq!(written, path_str);
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, log.render());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_clear_empties_log() {
    let mut log = sample_log();
    log.clear();
    assert!(log.entries.is_empty());
    assert!(log.recent(3).is_empty());
}
