//! Headless scenario execution
//!
//! Runs an ability scenario without any window, suitable for automated
//! testing. Time advances by a fixed real-time step per frame, so a scenario
//! (with a seed, if it uses random presses) always produces the same log.

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::abilities::ability_config::{AbilityDefinitions, AbilityKind, AbilityVariant};
use crate::abilities::host::{Collaborator, PlayerId};
use crate::abilities::instance::AbilityState;
use crate::abilities::perks::PerkProgressionTable;
use crate::abilities::session::AbilitySessions;
use crate::abilities::systems::{
    AbilityPlugin, AbilitySystemPhase, AbilityUser, AssignedDevices, AudioCueEvent, DamageShield,
    GrantCooldownSkip, HostActionTriggered, MatchEnded, MoveSpeed, PulseEmitter, RebindAbility,
    ReduceCooldowns, RetiredActionSets, SharedActionSet, WaveAdvanced, Weapon,
};
use crate::keybindings::{ControlEvent, ControlPath, GameAction, InputActionSet, InputDevice};
use crate::log::{AbilityLog, AbilityLogEntry, AbilityLogEventType};
use crate::settings::AbilitySettings;

use super::config::{HeadlessScenarioConfig, ScenarioAction, ScenarioStep};

/// Result of a completed headless scenario
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Real-time seconds simulated
    pub elapsed: f64,
    pub frames: u64,
    pub activations: usize,
    pub rejections: usize,
    /// Host actions fired by presses no ability claimed
    pub host_actions: Vec<(PlayerId, GameAction)>,
    pub cues_played: Vec<String>,
    /// Every ability's state at the end of the timeline, before teardown
    pub abilities: Vec<AbilitySummary>,
    /// The host's bindings ended the scenario the way they started it
    pub bindings_restored: bool,
    pub random_seed: Option<u64>,
    pub log_entries: Vec<AbilityLogEntry>,
    pub log_path: Option<String>,
}

/// One ability at the end of the timeline
#[derive(Debug, Clone, PartialEq)]
pub struct AbilitySummary {
    pub player: PlayerId,
    pub kind: AbilityKind,
    pub state: AbilityState,
    pub cooldown_remaining: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScenarioPhase {
    Running,
    /// Match ended, waiting for sessions to tear down
    Ending,
    Complete,
}

/// Resource to track headless scenario state
#[derive(Resource)]
pub struct ScenarioState {
    config: HeadlessScenarioConfig,
    steps: VecDeque<ScenarioStep>,
    phase: ScenarioPhase,
    entities: HashMap<PlayerId, Entity>,
    wave: u32,
    frames: u64,
    summaries: Vec<AbilitySummary>,
    host_actions: Vec<(PlayerId, GameAction)>,
    cues_played: Vec<String>,
    random_seed: Option<u64>,
    /// Populated when the scenario completes
    pub result: Option<ScenarioResult>,
}

impl ScenarioState {
    pub fn is_complete(&self) -> bool {
        self.phase == ScenarioPhase::Complete
    }
}

/// Plugin for headless scenario execution
pub struct HeadlessPlugin {
    pub config: HeadlessScenarioConfig,
    /// Timeline including generated random presses
    pub steps: Vec<ScenarioStep>,
    pub random_seed: Option<u64>,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ScenarioState {
            config: self.config.clone(),
            steps: self.steps.iter().cloned().collect(),
            phase: ScenarioPhase::Running,
            entities: HashMap::new(),
            wave: 0,
            frames: 0,
            summaries: Vec::new(),
            host_actions: Vec::new(),
            cues_played: Vec::new(),
            random_seed: self.random_seed,
            result: None,
        })
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / self.config.tick_rate_hz,
        )));

        app.add_systems(Startup, headless_setup_scenario)
            .add_systems(
                Update,
                run_scenario_steps.before(AbilitySystemPhase::Input),
            )
            .add_systems(
                Update,
                collect_scenario_feedback.after(AbilitySystemPhase::Effects),
            )
            .add_systems(
                PostUpdate,
                (headless_finish_scenario, headless_exit_on_complete)
                    .chain()
                    .after(AbilitySystemPhase::LatePass),
            );
    }
}

/// Setup system for the headless scenario
fn headless_setup_scenario(
    mut commands: Commands,
    mut state: ResMut<ScenarioState>,
    mut log: ResMut<AbilityLog>,
) {
    log.clear();
    log.log(
        0.0,
        None,
        AbilityLogEventType::MatchEvent,
        "Scenario started (headless mode)".to_string(),
    );

    match state.random_seed {
        Some(seed) => info!("Using deterministic press generation with seed: {}", seed),
        None => info!("No random presses"),
    }

    let players = state.config.players.clone();
    for player in &players {
        let mut entity = commands.spawn((
            AbilityUser::new(player.id, player.grant_kinds()),
            AssignedDevices::new(&player.devices),
        ));
        if player.has_collaborator(Collaborator::DamageShield) {
            entity.insert(DamageShield::default());
        }
        if player.has_collaborator(Collaborator::Weapon) {
            entity.insert(Weapon::default());
        }
        if player.has_collaborator(Collaborator::Physics) {
            entity.insert(PulseEmitter);
        }
        if player.has_collaborator(Collaborator::Movement) {
            entity.insert(MoveSpeed::default());
        }
        state.entities.insert(player.id, entity.id());
    }

    info!("Headless scenario setup complete: {} players", players.len());
}

/// Apply every timeline step that is due
#[allow(clippy::too_many_arguments)]
fn run_scenario_steps(
    mut commands: Commands,
    time: Res<Time<Real>>,
    mut state: ResMut<ScenarioState>,
    mut users: ScenarioUsers,
    mut perks: ResMut<PerkProgressionTable>,
    sessions: Res<AbilitySessions>,
    mut controls: EventWriter<ControlEvent>,
    mut waves: EventWriter<WaveAdvanced>,
    mut reductions: EventWriter<ReduceCooldowns>,
    mut skips: EventWriter<GrantCooldownSkip>,
    mut rebinds: EventWriter<RebindAbility>,
    mut match_ended: EventWriter<MatchEnded>,
) {
    if state.phase != ScenarioPhase::Running {
        return;
    }
    let now = time.elapsed_secs_f64();
    state.frames += 1;

    while state.steps.front().is_some_and(|s| s.at <= now) {
        let Some(step) = state.steps.pop_front() else {
            break;
        };
        let entity = step.action.player().and_then(|p| state.entities.get(&p).copied());

        match step.action {
            ScenarioAction::Press { device, path } => {
                controls.send(ControlEvent::new(device, path));
            }
            ScenarioAction::Wave => {
                state.wave += 1;
                waves.send(WaveAdvanced { wave: state.wave });
            }
            ScenarioAction::BreakShield { .. } => {
                if let Some(entity) = entity {
                    if let Ok((_, Some(mut shield))) = users.get_mut(entity) {
                        shield.enabled = false;
                        shield.reflective = false;
                    }
                }
            }
            ScenarioAction::Kill { .. } => set_alive(&mut users, entity, false),
            ScenarioAction::Revive { .. } => set_alive(&mut users, entity, true),
            ScenarioAction::Despawn { player } => {
                if let Some(entity) = state.entities.remove(&player) {
                    commands.entity(entity).despawn();
                }
            }
            ScenarioAction::SetPerk { perk, level } => {
                if let Err(e) = perks.set_level(&perk, level) {
                    warn!("Scenario perk change failed: {}", e);
                }
            }
            ScenarioAction::Rebind {
                player,
                ability,
                ultimate,
                old,
                new,
            } => {
                if let Some(kind) = AbilityKind::parse(&ability) {
                    rebinds.send(RebindAbility {
                        player,
                        kind,
                        variant: ScenarioAction::variant(ultimate),
                        old: ControlPath::new(old),
                        new: ControlPath::new(new),
                    });
                }
            }
            ScenarioAction::ReduceCooldowns { player, amount } => {
                reductions.send(ReduceCooldowns { player, amount });
            }
            ScenarioAction::SkipCooldown { player, ability } => {
                if let Some(kind) = AbilityKind::parse(&ability) {
                    skips.send(GrantCooldownSkip { player, kind });
                }
            }
        }
    }

    if now >= state.config.duration_secs {
        info!("Scenario timeline finished after {:.2}s", now);
        state.summaries = summarize(&sessions, &perks, now);
        state.phase = ScenarioPhase::Ending;
        match_ended.send(MatchEnded);
    }
}

type ScenarioUsers<'w, 's> = Query<'w, 's, (&'static mut AbilityUser, Option<&'static mut DamageShield>)>;

fn set_alive(users: &mut ScenarioUsers, entity: Option<Entity>, alive: bool) {
    if let Some(entity) = entity {
        if let Ok((mut user, _)) = users.get_mut(entity) {
            user.alive = alive;
        }
    }
}

fn summarize(sessions: &AbilitySessions, perks: &PerkProgressionTable, now: f64) -> Vec<AbilitySummary> {
    sessions
        .sessions
        .values()
        .flat_map(|session| {
            session.granted().map(move |kind| AbilitySummary {
                player: session.player(),
                kind,
                state: session
                    .instance(kind)
                    .map_or(AbilityState::Locked, |instance| instance.state(perks)),
                cooldown_remaining: session.cooldown_remaining(kind, now),
            })
        })
        .collect()
}

fn collect_scenario_feedback(
    mut state: ResMut<ScenarioState>,
    mut host_actions: EventReader<HostActionTriggered>,
    mut cues: EventReader<AudioCueEvent>,
) {
    for fired in host_actions.read() {
        state.host_actions.push((fired.player, fired.action));
    }
    for cue in cues.read() {
        state.cues_played.push(cue.cue.clone());
    }
}

/// Build the result once every session has ended
fn headless_finish_scenario(
    time: Res<Time<Real>>,
    mut state: ResMut<ScenarioState>,
    sessions: Res<AbilitySessions>,
    shared: Res<SharedActionSet>,
    retired: Res<RetiredActionSets>,
    settings: Res<AbilitySettings>,
    log: Res<AbilityLog>,
) {
    if state.phase != ScenarioPhase::Ending || !sessions.is_empty() {
        return;
    }

    let log_path = match state.config.output_path.as_deref() {
        Some(path) => match log.save_to_file(Some(path)) {
            Ok(filename) => {
                println!("Scenario complete. Log saved to: {}", filename);
                Some(filename)
            }
            Err(e) => {
                eprintln!("Failed to save ability log: {}", e);
                None
            }
        },
        None => None,
    };

    // Shared-mode sessions write through, so only the final shared set counts
    let bindings_restored = shared.0 == InputActionSet::default()
        && (!settings.isolate_player_actions || retired.0.values().all(|actions| *actions == shared.0));

    let result = ScenarioResult {
        elapsed: time.elapsed_secs_f64(),
        frames: state.frames,
        activations: log.filter_by_type(AbilityLogEventType::Activation).len(),
        rejections: log.filter_by_type(AbilityLogEventType::Rejection).len(),
        host_actions: state.host_actions.clone(),
        cues_played: state.cues_played.clone(),
        abilities: state.summaries.clone(),
        bindings_restored,
        random_seed: state.random_seed,
        log_entries: log.entries.clone(),
        log_path,
    };
    state.result = Some(result);
    state.phase = ScenarioPhase::Complete;
}

/// Exit the app when the scenario is complete
fn headless_exit_on_complete(state: Res<ScenarioState>, mut exit: EventWriter<AppExit>) {
    if state.is_complete() {
        exit.send(AppExit::Success);
    }
}

/// Presses of random granted ability controls, spread over the timeline
pub fn random_press_steps(
    config: &HeadlessScenarioConfig,
    definitions: &AbilityDefinitions,
    rng: &mut StdRng,
) -> Vec<ScenarioStep> {
    let mut candidates: Vec<(InputDevice, String)> = Vec::new();
    for player in &config.players {
        for kind in player.grant_kinds() {
            let Some(spec) = definitions.get(kind) else {
                continue;
            };
            for variant in [AbilityVariant::Base, AbilityVariant::Ultimate] {
                for path in spec.paths(variant) {
                    let control = ControlPath::new(path.as_str());
                    for device in &player.devices {
                        if control.layout() == Some(device.layout()) {
                            candidates.push((*device, path.clone()));
                        }
                    }
                }
            }
        }
    }
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut steps = Vec::with_capacity(config.random_presses as usize);
    for _ in 0..config.random_presses {
        let at = rng.gen_range(0.0..config.duration_secs);
        if let Some((device, path)) = candidates.choose(rng) {
            steps.push(ScenarioStep {
                at,
                action: ScenarioAction::Press {
                    device: *device,
                    path: path.clone(),
                },
            });
        }
    }
    steps
}

/// Apply starting perk levels, ability perks before the perks that need them
fn apply_starting_perks(perks: &mut PerkProgressionTable, levels: &[(String, u8)]) -> Result<(), String> {
    let mut ordered: Vec<&(String, u8)> = levels.iter().collect();
    ordered.sort_by_key(|(key, _)| perks.entry(key).map_or(0, |entry| entry.prerequisites.len()));
    for (key, level) in ordered {
        perks
            .set_level(key, *level)
            .map_err(|e| format!("Invalid starting perk: {}", e))?;
    }
    Ok(())
}

/// Build a ready-to-update headless app for `config`
pub fn build_scenario_app(config: HeadlessScenarioConfig, definitions: AbilityDefinitions) -> Result<App, String> {
    scenario_app(config, definitions, false)
}

fn scenario_app(config: HeadlessScenarioConfig, definitions: AbilityDefinitions, with_log: bool) -> Result<App, String> {
    config.validate()?;
    definitions.validate()?;

    let mut perks = PerkProgressionTable::for_abilities(&definitions);
    let levels: Vec<(String, u8)> = config.perks.iter().map(|(k, v)| (k.clone(), *v)).collect();
    apply_starting_perks(&mut perks, &levels)?;

    let mut steps = config.sorted_steps();
    let random_seed = if config.random_presses > 0 {
        let seed = config.random_seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        steps.extend(random_press_steps(&config, &definitions, &mut rng));
        steps.sort_by(|a, b| a.at.total_cmp(&b.at));
        Some(seed)
    } else {
        config.random_seed
    };

    let mut settings = AbilitySettings::load();
    if let Some(isolate) = config.isolate_player_actions {
        settings.isolate_player_actions = isolate;
    }

    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    if with_log {
        app.add_plugins(LogPlugin::default());
    }
    app
        .insert_resource(perks)
        .add_plugins(AbilityPlugin {
            definitions: Some(definitions),
            settings: Some(settings),
        })
        .add_plugins(HeadlessPlugin {
            config,
            steps,
            random_seed,
        });
    app.finish();
    app.cleanup();
    Ok(app)
}

/// Update `app` until its scenario completes
pub fn run_scenario_app(app: &mut App) -> Result<ScenarioResult, String> {
    let (duration, tick_rate) = {
        let state = app.world().resource::<ScenarioState>();
        (state.config.duration_secs, state.config.tick_rate_hz)
    };
    // Timeline frames, plus a few for teardown
    let max_frames = (duration * tick_rate).ceil() as u64 + 8;

    for _ in 0..max_frames {
        app.update();
        if app.world().resource::<ScenarioState>().is_complete() {
            break;
        }
    }

    app.world_mut()
        .resource_mut::<ScenarioState>()
        .result
        .take()
        .ok_or_else(|| format!("Scenario did not complete within {} frames", max_frames))
}

/// Run a scenario against the given ability definitions
pub fn run_scenario(config: HeadlessScenarioConfig, definitions: AbilityDefinitions) -> Result<ScenarioResult, String> {
    let mut app = build_scenario_app(config, definitions)?;
    run_scenario_app(&mut app)
}

/// Run a scenario with console logging, as the `--headless` CLI mode does
pub fn run_headless_scenario(config: HeadlessScenarioConfig, definitions: AbilityDefinitions) -> Result<ScenarioResult, String> {
    println!("Starting headless ability scenario...");
    println!("  Players: {}", config.players.len());
    println!("  Steps: {}", config.steps.len());
    println!("  Duration: {:.1}s at {:.0} Hz", config.duration_secs, config.tick_rate_hz);

    let mut app = scenario_app(config, definitions, true)?;
    run_scenario_app(&mut app)
}
