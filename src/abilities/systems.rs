//! Ability Systems - Bevy integration
//!
//! Wires the per-player sessions into a Bevy `App`:
//!
//! - `Input`: collect raw presses, start/end sessions (clearing perks at
//!   match end), sync perk unlocks, apply rebinds, dispatch presses to
//!   abilities or host actions
//! - `Timers`: fire due duration/cooldown timers, wave resets, reductions
//! - `Effects`: apply the effect requests queued by the two phases above
//! - `LatePass` (PostUpdate): detect effects the host ended this frame
//!
//! Ability timing uses `Time<Real>`, so pausing or slowing virtual time does
//! not stretch durations or cooldowns.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use std::collections::{BTreeMap, HashMap};

use crate::keybindings::{ControlEvent, ControlPath, GameAction, InputActionSet, InputDevice};
use crate::log::AbilityLog;
use crate::settings::AbilitySettings;

use super::ability_config::{load_ability_definitions, AbilityDefinitions, AbilityKind, AbilityVariant};
use super::events::AbilityEvent;
use super::host::{AbilityHost, Collaborator, DeviceList, EffectRequest, HostError, PlayerId};
use super::instance::Frame;
use super::perks::PerkProgressionTable;
use super::session::{AbilitySessions, PlayerAbilitySession};

// === Phases ===

/// System set labels for ability system ordering.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbilitySystemPhase {
    /// Phase 1: input collection, session lifecycle, dispatch
    Input,
    /// Phase 2: timers, wave resets, cooldown reductions
    Timers,
    /// Phase 3: apply queued effect requests to entities
    Effects,
    /// PostUpdate: early-deactivation detection
    LatePass,
}

/// Configures the ordering between ability system phases.
pub fn configure_ability_system_ordering(app: &mut App) {
    app.configure_sets(
        Update,
        (
            AbilitySystemPhase::Input,
            AbilitySystemPhase::Timers,
            AbilitySystemPhase::Effects,
        )
            .chain(),
    );
    app.configure_sets(PostUpdate, AbilitySystemPhase::LatePass);
}

// === Components ===

/// Marks a player's controlled entity
#[derive(Component, Debug, Clone)]
pub struct AbilityUser {
    pub player: PlayerId,
    /// Abilities this player may unlock
    pub grants: Vec<AbilityKind>,
    pub alive: bool,
}

impl AbilityUser {
    pub fn new(player: PlayerId, grants: Vec<AbilityKind>) -> Self {
        Self {
            player,
            grants,
            alive: true,
        }
    }
}

/// Input devices assigned to the player
#[derive(Component, Debug, Clone, Default)]
pub struct AssignedDevices(pub DeviceList);

impl AssignedDevices {
    pub fn new(devices: &[InputDevice]) -> Self {
        Self(devices.iter().copied().collect())
    }
}

#[derive(Component, Debug, Clone, Default)]
pub struct DamageShield {
    pub enabled: bool,
    pub reflective: bool,
}

#[derive(Component, Debug, Clone, Default)]
pub struct Weapon {
    pub refilling: bool,
    pub infinite_ammo: bool,
}

#[derive(Component, Debug, Clone)]
pub struct MoveSpeed {
    pub multiplier: f32,
}

impl Default for MoveSpeed {
    fn default() -> Self {
        Self { multiplier: 1.0 }
    }
}

/// Entity can emit area pulses
#[derive(Component, Debug, Clone, Default)]
pub struct PulseEmitter;

/// Effect request waiting to be applied in the Effects phase
#[derive(Component, Debug, Clone)]
pub struct AbilityEffectPending {
    pub target: Entity,
    pub player: PlayerId,
    pub request: EffectRequest,
}

// === Resources ===

/// The host's shared action definition every session starts from
#[derive(Resource, Debug, Clone, Default)]
pub struct SharedActionSet(pub InputActionSet);

/// Action sets handed back by ended sessions
#[derive(Resource, Debug, Clone, Default)]
pub struct RetiredActionSets(pub BTreeMap<PlayerId, InputActionSet>);

/// Which entity each session belongs to
#[derive(Resource, Debug, Clone, Default)]
pub struct SessionOwners(pub HashMap<Entity, PlayerId>);

/// Events from sessions that have already ended
#[derive(Resource, Debug, Default)]
pub struct RetiredEvents(pub Vec<AbilityEvent>);

// === Events ===

/// A new wave started: every cooldown resets
#[derive(Event, Debug, Clone)]
pub struct WaveAdvanced {
    pub wave: u32,
}

/// Take time off running cooldowns (one player, or everyone)
#[derive(Event, Debug, Clone)]
pub struct ReduceCooldowns {
    pub player: Option<PlayerId>,
    pub amount: f64,
}

/// One-shot: the player's ability skips its next cooldown
#[derive(Event, Debug, Clone)]
pub struct GrantCooldownSkip {
    pub player: PlayerId,
    pub kind: AbilityKind,
}

/// Player reassigned a trigger control
#[derive(Event, Debug, Clone)]
pub struct RebindAbility {
    pub player: PlayerId,
    pub kind: AbilityKind,
    pub variant: AbilityVariant,
    pub old: ControlPath,
    pub new: ControlPath,
}

/// Match over: every session ends
#[derive(Event, Debug, Clone, Default)]
pub struct MatchEnded;

/// A press no ability claimed fired one of the host's own actions
#[derive(Event, Debug, Clone, PartialEq, Eq)]
pub struct HostActionTriggered {
    pub player: PlayerId,
    pub action: GameAction,
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct AudioCueEvent {
    pub cue: String,
    pub volume: f32,
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct AreaPulseEvent {
    pub source: Entity,
    pub player: PlayerId,
    pub radius: f32,
    pub stun: bool,
}

// === Host adapter ===

type HostQueryData = (
    Entity,
    &'static AbilityUser,
    Option<&'static AssignedDevices>,
    Option<&'static DamageShield>,
    Has<Weapon>,
    Has<PulseEmitter>,
    Has<MoveSpeed>,
);

#[derive(Debug, Clone)]
struct PlayerView {
    entity: Entity,
    alive: bool,
    devices: Option<DeviceList>,
    shield_up: Option<bool>,
    has_weapon: bool,
    has_pulse: bool,
    has_movement: bool,
}

impl PlayerView {
    fn has(&self, collaborator: Collaborator) -> bool {
        match collaborator {
            Collaborator::DamageShield => self.shield_up.is_some(),
            Collaborator::Weapon => self.has_weapon,
            Collaborator::Physics => self.has_pulse,
            Collaborator::Movement => self.has_movement,
        }
    }
}

/// [`AbilityHost`] over a snapshot of this frame's ECS state.
///
/// Effect requests and cues are queued and written back by [`WorldHost::flush`].
#[derive(Debug, Default)]
pub struct WorldHost {
    players: HashMap<PlayerId, PlayerView>,
    requests: Vec<AbilityEffectPending>,
    cues: Vec<AudioCueEvent>,
}

impl WorldHost {
    fn snapshot(users: &Query<HostQueryData>) -> Self {
        let players = users
            .iter()
            .map(|(entity, user, devices, shield, weapon, pulse, movement)| {
                (
                    user.player,
                    PlayerView {
                        entity,
                        alive: user.alive,
                        devices: devices.map(|d| d.0.clone()),
                        shield_up: shield.map(|s| s.enabled),
                        has_weapon: weapon,
                        has_pulse: pulse,
                        has_movement: movement,
                    },
                )
            })
            .collect();
        Self {
            players,
            ..default()
        }
    }

    fn flush(self, commands: &mut Commands, cues: &mut EventWriter<AudioCueEvent>) {
        for pending in self.requests {
            commands.spawn(pending);
        }
        for cue in self.cues {
            cues.send(cue);
        }
    }
}

impl AbilityHost for WorldHost {
    fn is_alive(&self, player: PlayerId) -> bool {
        self.players.get(&player).is_some_and(|p| p.alive)
    }

    fn assigned_devices(&self, player: PlayerId) -> Result<DeviceList, HostError> {
        let view = self
            .players
            .get(&player)
            .ok_or(HostError::NoControlledEntity(player))?;
        view.devices.clone().ok_or_else(|| HostError::DeviceEnumeration {
            player,
            reason: "no AssignedDevices component".to_string(),
        })
    }

    fn apply_effect(&mut self, player: PlayerId, effect: EffectRequest) -> Result<(), HostError> {
        let view = self
            .players
            .get_mut(&player)
            .ok_or(HostError::NoControlledEntity(player))?;
        let collaborator = effect.collaborator();
        if !view.has(collaborator) {
            return Err(HostError::MissingCollaborator { player, collaborator });
        }
        // Keep the snapshot coherent for checks later in the same frame.
        if let EffectRequest::Shield { enabled, .. } = effect {
            view.shield_up = Some(enabled);
        }
        self.requests.push(AbilityEffectPending {
            target: view.entity,
            player,
            request: effect,
        });
        Ok(())
    }

    fn effect_running(&self, player: PlayerId, kind: AbilityKind) -> Option<bool> {
        match kind {
            AbilityKind::Barrier => self.players.get(&player).and_then(|p| p.shield_up),
            _ => None,
        }
    }

    fn play_cue(&mut self, cue: &str, volume: f32) {
        self.cues.push(AudioCueEvent {
            cue: cue.to_string(),
            volume,
        });
    }
}

/// Everything a system needs to run session operations for one frame.
#[derive(SystemParam)]
pub struct AbilityDriver<'w, 's> {
    commands: Commands<'w, 's>,
    time: Res<'w, Time<Real>>,
    perks: Res<'w, PerkProgressionTable>,
    settings: Res<'w, AbilitySettings>,
    shared: ResMut<'w, SharedActionSet>,
    sessions: ResMut<'w, AbilitySessions>,
    retired: ResMut<'w, RetiredEvents>,
    users: Query<'w, 's, HostQueryData>,
    cues: EventWriter<'w, AudioCueEvent>,
}

impl AbilityDriver<'_, '_> {
    pub fn now(&self) -> f64 {
        self.time.elapsed_secs_f64()
    }

    /// Run `f` for every session (or just `only`), then write back the
    /// effects and cues it requested.
    ///
    /// Shared-mode sessions operate on the live `SharedActionSet` while `f`
    /// runs.
    fn each_session(&mut self, only: Option<PlayerId>, mut f: impl FnMut(&mut PlayerAbilitySession, &mut Frame)) {
        let now = self.now();
        let mut host = WorldHost::snapshot(&self.users);
        let AbilitySessions { sessions, cues } = &mut *self.sessions;
        let shared = &mut self.shared.0;
        {
            let mut frame = Frame {
                now,
                perks: &self.perks,
                host: &mut host,
                cues,
                settings: &self.settings,
            };
            for (player, session) in sessions.iter_mut() {
                if only.is_some_and(|p| p != *player) {
                    continue;
                }
                session.swap_shared_actions(shared);
                f(session, &mut frame);
                session.swap_shared_actions(shared);
            }
        }
        host.flush(&mut self.commands, &mut self.cues);
    }

    fn begin_session(&mut self, session: PlayerAbilitySession) {
        let player = session.player();
        if let Some(previous) = self.sessions.remove(player) {
            warn!("Player {} already had a session, ending it first", player);
            self.finish_session(previous);
        }
        self.sessions.insert(session);
        self.each_session(Some(player), |session, frame| session.start(frame));
    }

    fn end_session(&mut self, player: PlayerId) -> Option<InputActionSet> {
        let session = self.sessions.remove(player)?;
        Some(self.finish_session(session))
    }

    fn finish_session(&mut self, mut session: PlayerAbilitySession) -> InputActionSet {
        let isolated = session.registry().is_isolated();
        session.swap_shared_actions(&mut self.shared.0);
        let now = self.now();
        let mut host = WorldHost::snapshot(&self.users);
        let (actions, events) = {
            let mut frame = Frame {
                now,
                perks: &self.perks,
                host: &mut host,
                cues: &mut self.sessions.cues,
                settings: &self.settings,
            };
            session.teardown(&mut frame)
        };
        self.retired.0.extend(events);
        host.flush(&mut self.commands, &mut self.cues);
        if !isolated {
            self.shared.0 = actions.clone();
        }
        actions
    }
}

// === Plugin ===

/// Adds the ability engine to an app.
///
/// Without explicit definitions the plugin loads `assets/config/abilities.ron`
/// and panics if it is invalid, the same as any other startup config.
#[derive(Default)]
pub struct AbilityPlugin {
    pub definitions: Option<AbilityDefinitions>,
    pub settings: Option<AbilitySettings>,
}

impl Plugin for AbilityPlugin {
    fn build(&self, app: &mut App) {
        let definitions = match &self.definitions {
            Some(definitions) => definitions.clone(),
            None => match load_ability_definitions() {
                Ok(definitions) => definitions,
                Err(e) => panic!("Failed to load ability definitions: {}", e),
            },
        };
        let settings = self.settings.clone().unwrap_or_else(AbilitySettings::load);

        if !app.world().contains_resource::<PerkProgressionTable>() {
            app.insert_resource(PerkProgressionTable::for_abilities(&definitions));
        }
        app.insert_resource(definitions)
            .insert_resource(settings)
            .init_resource::<SharedActionSet>()
            .init_resource::<RetiredActionSets>()
            .init_resource::<SessionOwners>()
            .init_resource::<RetiredEvents>()
            .init_resource::<AbilitySessions>()
            .init_resource::<AbilityLog>()
            .add_event::<ControlEvent>()
            .add_event::<AbilityEvent>()
            .add_event::<WaveAdvanced>()
            .add_event::<ReduceCooldowns>()
            .add_event::<GrantCooldownSkip>()
            .add_event::<RebindAbility>()
            .add_event::<MatchEnded>()
            .add_event::<HostActionTriggered>()
            .add_event::<AudioCueEvent>()
            .add_event::<AreaPulseEvent>();

        configure_ability_system_ordering(app);

        app.add_systems(
            Update,
            (
                (collect_keyboard_input, collect_gamepad_input),
                end_sessions,
                clear_perks_at_match_end,
                start_sessions,
                sync_perk_unlocks.run_if(resource_changed::<PerkProgressionTable>),
                apply_rebinds,
                dispatch_control_events,
            )
                .chain()
                .in_set(AbilitySystemPhase::Input),
        );

        app.add_systems(
            Update,
            (
                tick_ability_timers,
                apply_wave_resets,
                apply_cooldown_reductions,
                apply_cooldown_skips,
            )
                .chain()
                .in_set(AbilitySystemPhase::Timers),
        );

        // Flush queued effect entities between phases
        app.add_systems(
            Update,
            apply_deferred
                .after(AbilitySystemPhase::Timers)
                .before(AbilitySystemPhase::Effects),
        );

        app.add_systems(
            Update,
            (apply_pending_effects, publish_ability_events)
                .chain()
                .in_set(AbilitySystemPhase::Effects),
        );

        app.add_systems(
            PostUpdate,
            (late_pass, publish_ability_events)
                .chain()
                .in_set(AbilitySystemPhase::LatePass),
        );
    }
}

// === Input phase ===

/// Turn keyboard presses into control events
pub fn collect_keyboard_input(keys: Option<Res<ButtonInput<KeyCode>>>, mut controls: EventWriter<ControlEvent>) {
    let Some(keys) = keys else {
        return;
    };
    for key in keys.get_just_pressed() {
        controls.send(ControlEvent {
            device: InputDevice::Keyboard,
            path: ControlPath::keyboard(*key),
        });
    }
}

/// Turn gamepad presses into control events, one device per gamepad entity
pub fn collect_gamepad_input(gamepads: Query<(Entity, &Gamepad)>, mut controls: EventWriter<ControlEvent>) {
    for (entity, gamepad) in gamepads.iter() {
        for button in gamepad.get_just_pressed() {
            controls.send(ControlEvent {
                device: InputDevice::Gamepad(entity.to_bits()),
                path: ControlPath::gamepad(*button),
            });
        }
    }
}

/// Create a session for every newly spawned ability user
pub fn start_sessions(
    mut driver: AbilityDriver,
    added: Query<(Entity, &AbilityUser), Added<AbilityUser>>,
    definitions: Res<AbilityDefinitions>,
    mut owners: ResMut<SessionOwners>,
) {
    for (entity, user) in added.iter() {
        let grants = user
            .grants
            .iter()
            .filter_map(|kind| match definitions.get(*kind) {
                Some(spec) => Some((*kind, spec.clone())),
                None => {
                    warn!("Player {} granted undefined ability {}", user.player, kind.name());
                    None
                }
            })
            .collect::<Vec<_>>();
        let session = PlayerAbilitySession::with_actions(
            user.player,
            grants,
            &driver.shared.0,
            driver.settings.isolate_player_actions,
        );
        owners.0.insert(entity, user.player);
        driver.begin_session(session);
    }
}

/// End sessions whose entity went away, or all of them at match end
pub fn end_sessions(
    mut driver: AbilityDriver,
    mut removed: RemovedComponents<AbilityUser>,
    mut match_ended: EventReader<MatchEnded>,
    mut owners: ResMut<SessionOwners>,
    mut retired: ResMut<RetiredActionSets>,
) {
    let mut ending: Vec<PlayerId> = removed
        .read()
        .filter_map(|entity| owners.0.remove(&entity))
        .collect();

    if match_ended.read().count() > 0 {
        info!("Match ended, closing {} ability sessions", driver.sessions.len());
        ending.extend(driver.sessions.players());
        owners.0.clear();
    }

    for player in ending {
        if let Some(actions) = driver.end_session(player) {
            retired.0.insert(player, actions);
        }
    }
}

/// The progression table is match-scoped: every level resets once the
/// sessions have been torn down.
pub fn clear_perks_at_match_end(mut match_ended: EventReader<MatchEnded>, mut perks: ResMut<PerkProgressionTable>) {
    if match_ended.read().count() > 0 {
        info!("Match ended, clearing perk progression");
        perks.clear();
    }
}

/// Lazily create instances and claim paths when perks change
pub fn sync_perk_unlocks(mut driver: AbilityDriver) {
    driver.each_session(None, |session, frame| session.sync_unlocks(frame.now, frame.perks));
}

pub fn apply_rebinds(mut driver: AbilityDriver, mut requests: EventReader<RebindAbility>) {
    for request in requests.read() {
        driver.each_session(Some(request.player), |session, frame| {
            if let Err(e) = session.rebind(frame.now, request.kind, request.variant, &request.old, &request.new) {
                warn!("Player {} rebind of {} failed: {}", request.player, request.kind.name(), e);
            }
        });
    }
}

/// Route presses to abilities; unclaimed presses fire host actions
pub fn dispatch_control_events(
    mut driver: AbilityDriver,
    mut controls: EventReader<ControlEvent>,
    mut host_actions: EventWriter<HostActionTriggered>,
) {
    let events: Vec<ControlEvent> = controls.read().cloned().collect();
    if events.is_empty() {
        return;
    }

    let mut fired = Vec::new();
    driver.each_session(None, |session, frame| {
        for event in &events {
            if session.handle_input(event, frame).is_none() {
                for action in session.host_actions(event, frame) {
                    fired.push(HostActionTriggered {
                        player: session.player(),
                        action,
                    });
                }
            }
        }
    });
    for action in fired {
        host_actions.send(action);
    }
}

// === Timers phase ===

pub fn tick_ability_timers(mut driver: AbilityDriver) {
    driver.each_session(None, |session, frame| session.tick(frame));
}

pub fn apply_wave_resets(mut driver: AbilityDriver, mut waves: EventReader<WaveAdvanced>) {
    let Some(wave) = waves.read().last().map(|w| w.wave) else {
        return;
    };
    info!("Wave {} started, resetting ability cooldowns", wave);
    driver.each_session(None, |session, frame| session.set_cooldowns_to_zero(frame));
}

pub fn apply_cooldown_reductions(mut driver: AbilityDriver, mut reductions: EventReader<ReduceCooldowns>) {
    for reduction in reductions.read() {
        driver.each_session(reduction.player, |session, frame| {
            session.reduce_cooldowns(reduction.amount, frame)
        });
    }
}

pub fn apply_cooldown_skips(mut sessions: ResMut<AbilitySessions>, mut skips: EventReader<GrantCooldownSkip>) {
    for skip in skips.read() {
        if let Some(session) = sessions.get_mut(skip.player) {
            session.skip_next_cooldown(skip.kind);
        }
    }
}

// === Effects phase ===

/// Apply queued effect requests to their target entities
pub fn apply_pending_effects(
    mut commands: Commands,
    pending: Query<(Entity, &AbilityEffectPending)>,
    mut shields: Query<&mut DamageShield>,
    mut weapons: Query<&mut Weapon>,
    mut speeds: Query<&mut MoveSpeed>,
    mut pulses: EventWriter<AreaPulseEvent>,
) {
    for (pending_entity, pending) in pending.iter() {
        match &pending.request {
            EffectRequest::Shield { enabled, reflective } => {
                if let Ok(mut shield) = shields.get_mut(pending.target) {
                    shield.enabled = *enabled;
                    shield.reflective = *enabled && *reflective;
                }
            }
            EffectRequest::AmmoRefill { active, infinite } => {
                if let Ok(mut weapon) = weapons.get_mut(pending.target) {
                    weapon.refilling = *active;
                    weapon.infinite_ammo = *active && *infinite;
                }
            }
            EffectRequest::SpeedBoost { multiplier } => {
                if let Ok(mut speed) = speeds.get_mut(pending.target) {
                    speed.multiplier = *multiplier;
                }
            }
            EffectRequest::AreaPulse { radius, stun } => {
                pulses.send(AreaPulseEvent {
                    source: pending.target,
                    player: pending.player,
                    radius: *radius,
                    stun: *stun,
                });
            }
        }
        commands.entity(pending_entity).despawn();
    }
}

/// Republish buffered ability events and record them in the log
pub fn publish_ability_events(
    mut sessions: ResMut<AbilitySessions>,
    mut retired: ResMut<RetiredEvents>,
    mut log: ResMut<AbilityLog>,
    mut writer: EventWriter<AbilityEvent>,
) {
    let mut events = std::mem::take(&mut retired.0);
    for session in sessions.sessions.values_mut() {
        events.extend(session.drain_events());
    }
    for event in events {
        log.record(&event);
        writer.send(event);
    }
}

// === Late pass ===

pub fn late_pass(mut driver: AbilityDriver) {
    driver.each_session(None, |session, frame| session.late_update(frame));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn match_app(perk_levels: &[(&str, u8)], isolate: bool) -> App {
        let definitions = AbilityDefinitions::default();
        let mut perks = PerkProgressionTable::for_abilities(&definitions);
        for (key, level) in perk_levels {
            perks.set_level(key, *level).unwrap();
        }
        let settings = AbilitySettings {
            isolate_player_actions: isolate,
            ..Default::default()
        };

        let mut app = App::new();
        app.add_plugins(MinimalPlugins).insert_resource(perks).add_plugins(AbilityPlugin {
            definitions: Some(definitions),
            settings: Some(settings),
        });
        app.finish();
        app.cleanup();
        app.world_mut().spawn((
            AbilityUser::new(0, vec![AbilityKind::Barrier, AbilityKind::Shockwave]),
            AssignedDevices::new(&[InputDevice::Keyboard]),
        ));
        app.update();
        app
    }

    #[test]
    fn test_system_phase_ordering() {
        assert_ne!(AbilitySystemPhase::Input, AbilitySystemPhase::Timers);
        assert_ne!(AbilitySystemPhase::Timers, AbilitySystemPhase::Effects);
    }

    #[test]
    fn test_world_host_reports_missing_collaborator() {
        let mut host = WorldHost::default();
        host.players.insert(
            0,
            PlayerView {
                entity: Entity::PLACEHOLDER,
                alive: true,
                devices: None,
                shield_up: None,
                has_weapon: true,
                has_pulse: false,
                has_movement: false,
            },
        );
        let result = host.apply_effect(
            0,
            EffectRequest::Shield {
                enabled: true,
                reflective: false,
            },
        );
        assert_eq!(
            result,
            Err(HostError::MissingCollaborator {
                player: 0,
                collaborator: Collaborator::DamageShield
            })
        );
        assert!(host
            .apply_effect(
                0,
                EffectRequest::AmmoRefill {
                    active: true,
                    infinite: false
                }
            )
            .is_ok());
        assert_eq!(host.requests.len(), 1);
    }

    #[test]
    fn test_world_host_without_devices_fails_enumeration() {
        let mut host = WorldHost::default();
        host.players.insert(
            3,
            PlayerView {
                entity: Entity::PLACEHOLDER,
                alive: true,
                devices: None,
                shield_up: Some(false),
                has_weapon: false,
                has_pulse: false,
                has_movement: false,
            },
        );
        assert!(matches!(
            host.assigned_devices(3),
            Err(HostError::DeviceEnumeration { player: 3, .. })
        ));
        assert_eq!(host.effect_running(3, AbilityKind::Barrier), Some(false));
        assert_eq!(host.effect_running(3, AbilityKind::Resupply), None);
    }

    // =========================================================================
    // Match lifecycle
    // =========================================================================

    #[test]
    fn test_match_end_clears_perk_progression() {
        let mut app = match_app(&[("barrier", 2)], true);
        assert_eq!(app.world().resource::<AbilitySessions>().len(), 1);

        app.world_mut().send_event(MatchEnded);
        app.update();

        assert!(app.world().resource::<AbilitySessions>().is_empty());
        assert!(app.world().resource::<RetiredActionSets>().0.contains_key(&0));
        assert_eq!(app.world().resource::<PerkProgressionTable>().level("barrier"), 0);
    }

    #[test]
    fn test_shared_mode_claims_write_through_to_shared_set() {
        let mut app = match_app(&[("shockwave", 1)], false);
        assert_eq!(
            app.world()
                .resource::<SharedActionSet>()
                .0
                .binding_display(GameAction::Melee),
            "Unbound"
        );

        app.world_mut().send_event(MatchEnded);
        app.update();

        assert_eq!(
            app.world().resource::<SharedActionSet>().0,
            InputActionSet::create_defaults()
        );
    }

    #[test]
    fn test_isolated_mode_leaves_shared_set_untouched() {
        let app = match_app(&[("shockwave", 1)], true);
        assert_eq!(
            app.world().resource::<SharedActionSet>().0,
            InputActionSet::create_defaults()
        );
        let session = app.world().resource::<AbilitySessions>().get(0).unwrap();
        assert_eq!(
            session.registry().actions().binding_display(GameAction::Melee),
            "Unbound"
        );
    }
}
