//! Ability Instance - lifecycle state machine
//!
//! One instance per player per ability kind.
//!
//! ```text
//!            unlock perk > 0
//!   Locked ------------------> Ready
//!                               |  activate / activate_ultimate
//!                               v
//!                             Active --(duration elapsed | deactivate | instant)--+
//!                               ^                                                  |
//!                               |            skip_next_cooldown set                v
//!                             Ready <------------------------------------ (cooldown?)
//!                               ^                                                  |
//!                               +------------ cooldown elapsed ------ OnCooldown <-+
//! ```
//!
//! Locked is derived from the perk table, never stored. Base and ultimate share
//! the same Active/OnCooldown slot. Only the instance's own methods change its
//! state; everything else reads it.

use bevy::prelude::*;
use std::sync::Arc;

use crate::settings::AbilitySettings;

use super::ability_config::{AbilityKind, AbilitySpec, AbilityVariant};
use super::cues::CueThrottle;
use super::effects::{AbilityHooks, EffectInputs};
use super::events::{AbilityEvent, AbilityEventKind, DeactivationCause, RejectReason};
use super::host::{AbilityHost, EffectRequest, PlayerId};
use super::modifiers::PerkModifierProvider;
use super::perks::PerkProgressionTable;
use super::timers::{DueTask, TaskHandle, TaskScheduler, TimerKind};

/// Everything the host supplies for one tick
pub struct Frame<'f> {
    /// Real-time seconds
    pub now: f64,
    pub perks: &'f PerkProgressionTable,
    pub host: &'f mut dyn AbilityHost,
    pub cues: &'f mut CueThrottle,
    pub settings: &'f AbilitySettings,
}

/// A frame plus the owning session's scheduler and event outbox
pub struct AbilityContext<'c, 'f> {
    /// Time the current operation happens at. Equals `frame.now`, except for
    /// timer callbacks, which run at the exact time the timer was due.
    pub now: f64,
    pub frame: &'c mut Frame<'f>,
    pub scheduler: &'c mut TaskScheduler,
    pub events: &'c mut Vec<AbilityEvent>,
}

impl<'c, 'f> AbilityContext<'c, 'f> {
    pub fn new(
        frame: &'c mut Frame<'f>,
        scheduler: &'c mut TaskScheduler,
        events: &'c mut Vec<AbilityEvent>,
    ) -> Self {
        Self {
            now: frame.now,
            frame,
            scheduler,
            events,
        }
    }
}

/// Stored lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityPhase {
    Ready,
    Active,
    OnCooldown,
}

/// Observable state, including the derived Locked state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityState {
    Locked,
    Ready,
    Active,
    OnCooldown,
}

#[derive(Debug)]
pub struct AbilityInstance {
    player: PlayerId,
    kind: AbilityKind,
    spec: Arc<AbilitySpec>,
    phase: AbilityPhase,
    ultimate_active: bool,
    skip_next_cooldown: bool,
    duration_timer: Option<TaskHandle>,
    cooldown_timer: Option<TaskHandle>,
    /// Variant whose cooldown is running
    cooldown_variant: Option<AbilityVariant>,
    torn_down: bool,
}

impl AbilityInstance {
    pub fn new(player: PlayerId, kind: AbilityKind, spec: Arc<AbilitySpec>) -> Self {
        Self {
            player,
            kind,
            spec,
            phase: AbilityPhase::Ready,
            ultimate_active: false,
            skip_next_cooldown: false,
            duration_timer: None,
            cooldown_timer: None,
            cooldown_variant: None,
            torn_down: false,
        }
    }

    // === Queries ===

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn kind(&self) -> AbilityKind {
        self.kind
    }

    pub fn spec(&self) -> &Arc<AbilitySpec> {
        &self.spec
    }

    pub fn phase(&self) -> AbilityPhase {
        self.phase
    }

    pub fn state(&self, perks: &PerkProgressionTable) -> AbilityState {
        if !self.is_unlocked(perks) {
            return AbilityState::Locked;
        }
        match self.phase {
            AbilityPhase::Ready => AbilityState::Ready,
            AbilityPhase::Active => AbilityState::Active,
            AbilityPhase::OnCooldown => AbilityState::OnCooldown,
        }
    }

    pub fn is_unlocked(&self, perks: &PerkProgressionTable) -> bool {
        perks.is_unlocked(&self.spec.perk_key)
    }

    pub fn is_ultimate_unlocked(&self, perks: &PerkProgressionTable) -> bool {
        self.spec.has_ultimate() && perks.is_unlocked(&self.spec.ultimate_key())
    }

    pub fn is_active(&self) -> bool {
        self.phase == AbilityPhase::Active
    }

    pub fn is_on_cooldown(&self) -> bool {
        self.phase == AbilityPhase::OnCooldown
    }

    pub fn is_ultimate_active(&self) -> bool {
        self.ultimate_active
    }

    pub fn skip_next_cooldown(&self) -> bool {
        self.skip_next_cooldown
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn duration_timer(&self) -> Option<TaskHandle> {
        self.duration_timer
    }

    pub fn cooldown_timer(&self) -> Option<TaskHandle> {
        self.cooldown_timer
    }

    pub fn cooldown_variant(&self) -> Option<AbilityVariant> {
        self.cooldown_variant
    }

    /// Seconds left on the running cooldown (0.0 when not cooling down)
    pub fn cooldown_remaining(&self, scheduler: &TaskScheduler, now: f64) -> f64 {
        self.cooldown_timer
            .and_then(|handle| scheduler.remaining(handle, now))
            .unwrap_or(0.0)
    }

    // === External overrides ===

    /// One-shot: the next deactivation goes straight back to Ready.
    pub fn set_skip_next_cooldown(&mut self, skip: bool) {
        self.skip_next_cooldown = skip;
    }

    // === Transitions ===

    pub fn activate(&mut self, cx: &mut AbilityContext) -> Result<(), RejectReason> {
        self.try_activate(AbilityVariant::Base, cx)
    }

    pub fn activate_ultimate(&mut self, cx: &mut AbilityContext) -> Result<(), RejectReason> {
        self.try_activate(AbilityVariant::Ultimate, cx)
    }

    /// End the active ability early (e.g. the host broke the shield).
    pub fn deactivate(&mut self, cx: &mut AbilityContext) {
        self.end(cx, DeactivationCause::External);
    }

    fn try_activate(&mut self, variant: AbilityVariant, cx: &mut AbilityContext) -> Result<(), RejectReason> {
        if let Err(reason) = self.check_preconditions(variant, cx) {
            if reason == RejectReason::OnCooldown {
                self.play_not_ready_cue(cx);
            }
            debug!(
                "Player {} {} {:?} rejected: {}",
                self.player,
                self.kind.name(),
                variant,
                reason.as_str()
            );
            self.emit(cx, AbilityEventKind::Rejected { variant, reason });
            return Err(reason);
        }
        self.begin(variant, cx)
    }

    fn check_preconditions(&self, variant: AbilityVariant, cx: &AbilityContext) -> Result<(), RejectReason> {
        if self.torn_down {
            return Err(RejectReason::TornDown);
        }
        if !self.is_unlocked(cx.frame.perks) {
            return Err(RejectReason::Locked);
        }
        if variant == AbilityVariant::Ultimate && !self.is_ultimate_unlocked(cx.frame.perks) {
            return Err(RejectReason::UltimateLocked);
        }
        if !cx.frame.host.is_alive(self.player) {
            return Err(RejectReason::Dead);
        }
        match self.phase {
            AbilityPhase::Active => Err(RejectReason::AlreadyActive),
            AbilityPhase::OnCooldown => Err(RejectReason::OnCooldown),
            AbilityPhase::Ready => Ok(()),
        }
    }

    /// Enter Active without checking preconditions.
    fn begin(&mut self, variant: AbilityVariant, cx: &mut AbilityContext) -> Result<(), RejectReason> {
        let duration = PerkModifierProvider::effective_duration(&self.spec, cx.frame.perks, variant);

        let request = {
            let inputs = EffectInputs {
                spec: &self.spec,
                perks: cx.frame.perks,
            };
            match variant {
                AbilityVariant::Base => self.kind.on_activate(&inputs),
                AbilityVariant::Ultimate => self.kind.on_activate_ultimate(&inputs),
            }
        };
        if let Some(request) = request {
            if let Err(e) = cx.frame.host.apply_effect(self.player, request) {
                warn!(
                    "{} activation skipped for player {}: {}",
                    self.kind.name(),
                    self.player,
                    e
                );
                self.emit(
                    cx,
                    AbilityEventKind::Rejected {
                        variant,
                        reason: RejectReason::MissingCollaborator,
                    },
                );
                return Err(RejectReason::MissingCollaborator);
            }
        }

        self.phase = AbilityPhase::Active;
        self.ultimate_active = variant == AbilityVariant::Ultimate;
        if let Some(cue) = self.spec.cue(variant) {
            let volume = cx.frame.settings.activation_volume;
            cx.frame.host.play_cue(cue, volume);
        }
        self.emit(cx, AbilityEventKind::Activated { variant, duration });

        // A stale timer from an earlier activation must never end this one.
        if let Some(stale) = self.duration_timer.take() {
            cx.scheduler.cancel(stale);
        }

        if duration > 0.0 {
            self.duration_timer = Some(cx.scheduler.schedule(
                self.kind,
                TimerKind::Duration,
                cx.now,
                f64::from(duration),
            ));
        } else {
            self.end(cx, DeactivationCause::Instant);
        }
        Ok(())
    }

    /// Active -> OnCooldown, or straight to Ready when the skip flag is set.
    fn end(&mut self, cx: &mut AbilityContext, cause: DeactivationCause) {
        if self.phase != AbilityPhase::Active {
            return;
        }
        if let Some(handle) = self.duration_timer.take() {
            cx.scheduler.cancel(handle);
        }

        let variant = if self.ultimate_active {
            AbilityVariant::Ultimate
        } else {
            AbilityVariant::Base
        };
        self.send_off_request(variant, cx);
        self.ultimate_active = false;
        self.emit(cx, AbilityEventKind::Deactivated { variant, cause });

        if self.skip_next_cooldown {
            self.skip_next_cooldown = false;
            self.phase = AbilityPhase::Ready;
            self.emit(cx, AbilityEventKind::CooldownSkipped);
            return;
        }

        // Cooldown length is fixed by the variant that just ended.
        let cooldown = PerkModifierProvider::effective_cooldown(&self.spec, cx.frame.perks, variant);
        if let Some(stale) = self.cooldown_timer.take() {
            cx.scheduler.cancel(stale);
        }
        self.cooldown_timer = Some(cx.scheduler.schedule(
            self.kind,
            TimerKind::Cooldown,
            cx.now,
            f64::from(cooldown),
        ));
        self.cooldown_variant = Some(variant);
        self.phase = AbilityPhase::OnCooldown;
        self.emit(cx, AbilityEventKind::CooldownStarted { variant, cooldown });
    }

    fn finish_cooldown(&mut self, cx: &mut AbilityContext) {
        self.phase = AbilityPhase::Ready;
        self.cooldown_variant = None;
        self.emit(cx, AbilityEventKind::Ready);
    }

    /// Route a due timer back into the state machine.
    ///
    /// Handles this instance no longer holds (replaced or cancelled) are
    /// ignored, as is everything after teardown.
    pub fn on_timer(&mut self, due: &DueTask, cx: &mut AbilityContext) {
        if self.torn_down {
            debug!("Timer fired for torn down {} (player {})", self.kind.name(), self.player);
            return;
        }
        match due.kind {
            TimerKind::Duration => {
                if self.duration_timer != Some(due.handle) {
                    return;
                }
                self.duration_timer = None;
                self.end(cx, DeactivationCause::Expired);
            }
            TimerKind::Cooldown => {
                if self.cooldown_timer != Some(due.handle) {
                    return;
                }
                self.cooldown_timer = None;
                if self.phase == AbilityPhase::OnCooldown {
                    self.finish_cooldown(cx);
                }
            }
        }
    }

    /// Mass reset (new wave). Safe in any state.
    pub fn set_cooldown_to_zero(&mut self, cx: &mut AbilityContext) {
        if self.torn_down {
            return;
        }
        match self.phase {
            AbilityPhase::OnCooldown => {
                if let Some(handle) = self.cooldown_timer.take() {
                    cx.scheduler.cancel(handle);
                }
                self.phase = AbilityPhase::Ready;
                self.cooldown_variant = None;
                self.emit(cx, AbilityEventKind::CooldownReset);
            }
            AbilityPhase::Active => self.skip_next_cooldown = true,
            AbilityPhase::Ready => {}
        }
    }

    /// Take `amount` seconds off a running cooldown. Safe in any state.
    pub fn reduce_cooldown(&mut self, amount: f64, cx: &mut AbilityContext) {
        if self.torn_down || self.phase != AbilityPhase::OnCooldown || amount <= 0.0 {
            return;
        }
        let Some(handle) = self.cooldown_timer.take() else {
            return;
        };
        let remaining = cx.scheduler.remaining(handle, cx.now).unwrap_or(0.0) - amount;
        cx.scheduler.cancel(handle);

        if remaining <= 0.0 {
            self.finish_cooldown(cx);
        } else {
            self.cooldown_timer = Some(cx.scheduler.schedule(
                self.kind,
                TimerKind::Cooldown,
                cx.now,
                remaining,
            ));
            self.emit(cx, AbilityEventKind::CooldownReduced { remaining });
        }
    }

    /// Late-pass check: did the host end our sustained effect this frame?
    pub fn late_update(&mut self, cx: &mut AbilityContext) {
        if self.torn_down || self.phase != AbilityPhase::Active {
            return;
        }
        if cx.frame.host.effect_running(self.player, self.kind) == Some(false) {
            info!(
                "Player {} {} ended early by host",
                self.player,
                self.kind.name()
            );
            self.end(cx, DeactivationCause::External);
        }
    }

    /// Cancel both timers and switch off any running effect. Later timer
    /// callbacks become no-ops.
    pub fn teardown(&mut self, cx: &mut AbilityContext) {
        if self.torn_down {
            return;
        }
        if let Some(handle) = self.duration_timer.take() {
            cx.scheduler.cancel(handle);
        }
        if let Some(handle) = self.cooldown_timer.take() {
            cx.scheduler.cancel(handle);
        }
        if self.phase == AbilityPhase::Active {
            let variant = if self.ultimate_active {
                AbilityVariant::Ultimate
            } else {
                AbilityVariant::Base
            };
            self.send_off_request(variant, cx);
        }
        self.ultimate_active = false;
        self.cooldown_variant = None;
        self.torn_down = true;
    }

    fn send_off_request(&self, variant: AbilityVariant, cx: &mut AbilityContext) {
        let request: Option<EffectRequest> = {
            let inputs = EffectInputs {
                spec: &self.spec,
                perks: cx.frame.perks,
            };
            match variant {
                AbilityVariant::Base => self.kind.on_deactivate(&inputs),
                AbilityVariant::Ultimate => self.kind.on_deactivate_ultimate(&inputs),
            }
        };
        if let Some(request) = request {
            if let Err(e) = cx.frame.host.apply_effect(self.player, request) {
                warn!("{} deactivation effect failed: {}", self.kind.name(), e);
            }
        }
    }

    fn play_not_ready_cue(&self, cx: &mut AbilityContext) {
        let settings = cx.frame.settings;
        if cx
            .frame
            .cues
            .try_fire(self.player, cx.now, settings.not_ready_interval_secs)
        {
            cx.frame
                .host
                .play_cue(&settings.not_ready_cue, settings.not_ready_volume);
        }
    }

    fn emit(&self, cx: &mut AbilityContext, detail: AbilityEventKind) {
        cx.events.push(AbilityEvent {
            player: self.player,
            kind: self.kind,
            at: cx.now,
            detail,
        });
    }

    /// Enter Active bypassing every precondition (tests only).
    #[cfg(test)]
    pub(crate) fn force_activate(&mut self, variant: AbilityVariant, cx: &mut AbilityContext) {
        let _ = self.begin(variant, cx);
    }
}
