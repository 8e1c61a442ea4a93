//! Player Ability Session
//!
//! Owns one player's ability instances, binding registry and timer queue, and
//! the order they are created and destroyed in:
//!
//! - instances are created lazily, when their perk first unlocks, and only
//!   then claim their activation paths
//! - ultimate paths are claimed once the ultimate perk unlocks
//! - teardown releases every claimed path (newest first) before the
//!   instances are torn down and dropped

use bevy::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::keybindings::{ControlEvent, ControlPath, GameAction, InputActionSet};

use super::ability_config::{AbilityKind, AbilitySpec, AbilityVariant};
use super::binding::{AbilityTrigger, BindingError, BindingRegistry};
use super::cues::CueThrottle;
use super::events::{AbilityEvent, AbilityEventKind, RejectReason};
use super::host::PlayerId;
use super::instance::{AbilityContext, AbilityInstance, Frame};
use super::perks::PerkProgressionTable;
use super::timers::TaskScheduler;

#[derive(Debug)]
pub struct PlayerAbilitySession {
    player: PlayerId,
    grants: BTreeMap<AbilityKind, Arc<AbilitySpec>>,
    registry: BindingRegistry,
    instances: BTreeMap<AbilityKind, AbilityInstance>,
    /// Current trigger paths, seeded from the spec and changed by rebinding
    trigger_paths: HashMap<AbilityTrigger, Vec<ControlPath>>,
    /// Triggers the perk table currently allows to claim paths
    unlocked: HashSet<AbilityTrigger>,
    scheduler: TaskScheduler,
    events: Vec<AbilityEvent>,
}

impl PlayerAbilitySession {
    pub fn new(
        player: PlayerId,
        grants: impl IntoIterator<Item = (AbilityKind, Arc<AbilitySpec>)>,
        registry: BindingRegistry,
    ) -> Self {
        Self {
            player,
            grants: grants.into_iter().collect(),
            registry,
            instances: BTreeMap::new(),
            trigger_paths: HashMap::new(),
            unlocked: HashSet::new(),
            scheduler: TaskScheduler::new(),
            events: Vec::new(),
        }
    }

    /// Session over a copy (or isolated copy) of the host action set.
    pub fn with_actions(
        player: PlayerId,
        grants: impl IntoIterator<Item = (AbilityKind, Arc<AbilitySpec>)>,
        actions: &InputActionSet,
        isolate: bool,
    ) -> Self {
        let registry = if isolate {
            BindingRegistry::isolated(actions)
        } else {
            BindingRegistry::shared(actions.clone())
        };
        Self::new(player, grants, registry)
    }

    // === Queries ===

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn instance(&self, kind: AbilityKind) -> Option<&AbilityInstance> {
        self.instances.get(&kind)
    }

    pub fn instances(&self) -> impl Iterator<Item = &AbilityInstance> {
        self.instances.values()
    }

    /// Granted kinds, locked or not
    pub fn granted(&self) -> impl Iterator<Item = AbilityKind> + '_ {
        self.grants.keys().copied()
    }

    pub fn is_granted(&self, kind: AbilityKind) -> bool {
        self.grants.contains_key(&kind)
    }

    pub fn cooldown_remaining(&self, kind: AbilityKind, now: f64) -> f64 {
        self.instances
            .get(&kind)
            .map(|i| i.cooldown_remaining(&self.scheduler, now))
            .unwrap_or(0.0)
    }

    pub fn trigger_paths(&self, kind: AbilityKind, variant: AbilityVariant) -> &[ControlPath] {
        self.trigger_paths
            .get(&AbilityTrigger::new(kind, variant))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Take every event buffered since the last drain
    pub fn drain_events(&mut self) -> Vec<AbilityEvent> {
        std::mem::take(&mut self.events)
    }

    /// Shared mode: swap the host's live action set in (or back out) around
    /// an operation. Isolated sessions keep their own copy.
    pub fn swap_shared_actions(&mut self, shared: &mut InputActionSet) {
        if !self.registry.is_isolated() {
            self.registry.swap_actions(shared);
        }
    }

    // === Lifecycle ===

    pub fn start(&mut self, frame: &mut Frame) {
        info!(
            "Starting ability session for player {} ({} granted)",
            self.player,
            self.grants.len()
        );
        self.sync_unlocks(frame.now, frame.perks);
    }

    /// Create instances for newly unlocked abilities and claim or release
    /// paths to match what the perk table currently allows.
    pub fn sync_unlocks(&mut self, now: f64, perks: &PerkProgressionTable) {
        let grants: Vec<(AbilityKind, Arc<AbilitySpec>)> =
            self.grants.iter().map(|(k, s)| (*k, s.clone())).collect();

        for (kind, spec) in grants {
            let base_unlocked = perks.is_unlocked(&spec.perk_key);
            if base_unlocked && !self.instances.contains_key(&kind) {
                debug!("Player {} unlocked {}", self.player, spec.name);
                self.instances
                    .insert(kind, AbilityInstance::new(self.player, kind, spec.clone()));
            }
            if !self.instances.contains_key(&kind) {
                continue;
            }

            let ultimate_unlocked =
                base_unlocked && spec.has_ultimate() && perks.is_unlocked(&spec.ultimate_key());
            self.set_claimed(now, kind, &spec, AbilityVariant::Base, base_unlocked);
            self.set_claimed(now, kind, &spec, AbilityVariant::Ultimate, ultimate_unlocked);
        }
    }

    fn set_claimed(
        &mut self,
        now: f64,
        kind: AbilityKind,
        spec: &AbilitySpec,
        variant: AbilityVariant,
        claim: bool,
    ) {
        let trigger = AbilityTrigger::new(kind, variant);
        if claim {
            self.unlocked.insert(trigger);
        } else {
            self.unlocked.remove(&trigger);
        }
        let paths = self
            .trigger_paths
            .entry(trigger)
            .or_insert_with(|| default_paths(spec, variant))
            .clone();

        // A path another trigger took over (by rebinding) stays with it.
        for path in paths {
            match self.registry.owner(&path) {
                None if claim => self.claim(now, &path, trigger),
                Some(owner) if owner == trigger && !claim => self.release(now, &path, trigger),
                _ => {}
            }
        }
    }

    fn claim(&mut self, now: f64, path: &ControlPath, trigger: AbilityTrigger) {
        let displaced = self.registry.owner(path).filter(|owner| *owner != trigger);
        match self.registry.register(path, trigger) {
            Ok(()) => {
                if let Some(previous) = displaced {
                    debug!(
                        "Player {} {} lost {} to {}",
                        self.player,
                        previous.kind.name(),
                        path,
                        trigger.kind.name()
                    );
                    self.push_event(
                        now,
                        previous.kind,
                        AbilityEventKind::BindingReleased { path: path.clone() },
                    );
                }
                self.push_event(
                    now,
                    trigger.kind,
                    AbilityEventKind::BindingClaimed {
                        variant: trigger.variant,
                        path: path.clone(),
                    },
                );
            }
            Err(e) => {
                warn!(
                    "Player {} {} cannot claim {:?}: {}",
                    self.player,
                    trigger.kind.name(),
                    path.as_str(),
                    e
                );
            }
        }
    }

    fn release(&mut self, now: f64, path: &ControlPath, trigger: AbilityTrigger) {
        self.registry.unregister(path);
        self.push_event(
            now,
            trigger.kind,
            AbilityEventKind::BindingReleased { path: path.clone() },
        );
    }

    /// Move one trigger path to another control.
    ///
    /// The old path is released if this trigger still owns it, then the new
    /// one is claimed whenever the trigger is unlocked. A malformed new path
    /// changes nothing.
    pub fn rebind(
        &mut self,
        now: f64,
        kind: AbilityKind,
        variant: AbilityVariant,
        old: &ControlPath,
        new: &ControlPath,
    ) -> Result<(), BindingError> {
        BindingRegistry::validate(new)?;
        let trigger = AbilityTrigger::new(kind, variant);
        if self.registry.owner(old) == Some(trigger) {
            self.release(now, old, trigger);
        }
        if self.unlocked.contains(&trigger) {
            self.claim(now, new, trigger);
        }

        let seeded = self
            .grants
            .get(&kind)
            .map(|spec| default_paths(spec, variant))
            .unwrap_or_default();
        let paths = self.trigger_paths.entry(trigger).or_insert(seeded);
        match paths.iter_mut().find(|p| p.eq_ignore_case(old)) {
            Some(slot) => *slot = new.clone(),
            None => paths.push(new.clone()),
        }
        info!(
            "Player {} rebound {} {:?}: {} -> {}",
            self.player,
            kind.name(),
            variant,
            old,
            new
        );
        Ok(())
    }

    // === Per-frame ===

    /// Route a raw control press to the owning ability, if any.
    ///
    /// Returns `None` when nothing of this player's claimed the press.
    pub fn handle_input(&mut self, event: &ControlEvent, frame: &mut Frame) -> Option<Result<(), RejectReason>> {
        let devices = match frame.host.assigned_devices(self.player) {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Ignoring input for player {}: {}", self.player, e);
                return None;
            }
        };
        let trigger = self.registry.dispatch(event, &devices)?;
        Some(self.trigger(trigger.kind, trigger.variant, frame))
    }

    /// Host actions an unclaimed press fires for this player.
    ///
    /// Presses from devices the player does not own fire nothing.
    pub fn host_actions(&self, event: &ControlEvent, frame: &Frame) -> Vec<GameAction> {
        match frame.host.assigned_devices(self.player) {
            Ok(devices) if devices.contains(&event.device) => {
                self.registry.actions().triggered_by(&event.path)
            }
            _ => Vec::new(),
        }
    }

    pub fn activate(&mut self, kind: AbilityKind, frame: &mut Frame) -> Result<(), RejectReason> {
        self.trigger(kind, AbilityVariant::Base, frame)
    }

    pub fn activate_ultimate(&mut self, kind: AbilityKind, frame: &mut Frame) -> Result<(), RejectReason> {
        self.trigger(kind, AbilityVariant::Ultimate, frame)
    }

    fn trigger(&mut self, kind: AbilityKind, variant: AbilityVariant, frame: &mut Frame) -> Result<(), RejectReason> {
        let Some(instance) = self.instances.get_mut(&kind) else {
            return Err(RejectReason::Locked);
        };
        let mut cx = AbilityContext::new(frame, &mut self.scheduler, &mut self.events);
        match variant {
            AbilityVariant::Base => instance.activate(&mut cx),
            AbilityVariant::Ultimate => instance.activate_ultimate(&mut cx),
        }
    }

    /// End an active ability early
    pub fn deactivate(&mut self, kind: AbilityKind, frame: &mut Frame) {
        if let Some(instance) = self.instances.get_mut(&kind) {
            let mut cx = AbilityContext::new(frame, &mut self.scheduler, &mut self.events);
            instance.deactivate(&mut cx);
        }
    }

    /// One-shot override: `kind` skips its next cooldown.
    pub fn skip_next_cooldown(&mut self, kind: AbilityKind) {
        if let Some(instance) = self.instances.get_mut(&kind) {
            instance.set_skip_next_cooldown(true);
        }
    }

    /// Fire every timer due by `frame.now`, each at its own due time.
    pub fn tick(&mut self, frame: &mut Frame) {
        while let Some(due) = self.scheduler.pop_due(frame.now) {
            let Some(instance) = self.instances.get_mut(&due.owner) else {
                continue;
            };
            let mut cx = AbilityContext::new(frame, &mut self.scheduler, &mut self.events);
            cx.now = due.due_at;
            instance.on_timer(&due, &mut cx);
        }
    }

    /// Late pass: pick up effects the host ended this frame.
    pub fn late_update(&mut self, frame: &mut Frame) {
        for instance in self.instances.values_mut() {
            let mut cx = AbilityContext::new(frame, &mut self.scheduler, &mut self.events);
            instance.late_update(&mut cx);
        }
    }

    /// New wave: every ability is ready again.
    pub fn set_cooldowns_to_zero(&mut self, frame: &mut Frame) {
        for instance in self.instances.values_mut() {
            let mut cx = AbilityContext::new(frame, &mut self.scheduler, &mut self.events);
            instance.set_cooldown_to_zero(&mut cx);
        }
    }

    pub fn reduce_cooldowns(&mut self, amount: f64, frame: &mut Frame) {
        for instance in self.instances.values_mut() {
            let mut cx = AbilityContext::new(frame, &mut self.scheduler, &mut self.events);
            instance.reduce_cooldown(amount, &mut cx);
        }
    }

    /// End the session. Returns the action set the player is left with and
    /// the final events.
    pub fn teardown(mut self, frame: &mut Frame) -> (InputActionSet, Vec<AbilityEvent>) {
        for path in self.registry.paths().into_iter().rev() {
            if let Some(trigger) = self.registry.owner(&path) {
                self.release(frame.now, &path, trigger);
            }
        }
        for instance in self.instances.values_mut() {
            let mut cx = AbilityContext::new(frame, &mut self.scheduler, &mut self.events);
            instance.teardown(&mut cx);
        }
        info!("Ended ability session for player {}", self.player);
        (self.registry.teardown(), self.events)
    }

    fn push_event(&mut self, now: f64, kind: AbilityKind, detail: AbilityEventKind) {
        self.events.push(AbilityEvent {
            player: self.player,
            kind,
            at: now,
            detail,
        });
    }
}

fn default_paths(spec: &AbilitySpec, variant: AbilityVariant) -> Vec<ControlPath> {
    spec.paths(variant).iter().map(|p| ControlPath::new(p.as_str())).collect()
}

/// Every connected player's session
#[derive(Resource, Debug, Default)]
pub struct AbilitySessions {
    pub sessions: BTreeMap<PlayerId, PlayerAbilitySession>,
    /// Shared across a player's abilities
    pub cues: CueThrottle,
}

impl AbilitySessions {
    pub fn get(&self, player: PlayerId) -> Option<&PlayerAbilitySession> {
        self.sessions.get(&player)
    }

    pub fn get_mut(&mut self, player: PlayerId) -> Option<&mut PlayerAbilitySession> {
        self.sessions.get_mut(&player)
    }

    pub fn insert(&mut self, session: PlayerAbilitySession) {
        self.sessions.insert(session.player(), session);
    }

    pub fn remove(&mut self, player: PlayerId) -> Option<PlayerAbilitySession> {
        self.cues.forget(player);
        self.sessions.remove(&player)
    }

    pub fn players(&self) -> Vec<PlayerId> {
        self.sessions.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
