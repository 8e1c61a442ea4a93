//! Binding Registry - input interception per player
//!
//! Abilities claim physical control paths as triggers. While a path is
//! claimed, every host binding that matches it is blanked so the control does
//! not fire both the ability and the host action. Releasing the claim puts
//! the original paths back, whatever order claims are released in.
//!
//! A host binding that is still matched by another live claim when its own
//! claim is released is handed over to that claim instead of being restored,
//! so at no point does a claimed control also fire a host action.

use bevy::prelude::*;
use smallvec::SmallVec;
use thiserror::Error;

use crate::keybindings::{BindingSlot, ControlEvent, ControlPath, InputActionSet, InputDevice};

use super::ability_config::{AbilityKind, AbilityVariant};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindingError {
    #[error("Cannot register an empty control path")]
    Empty,
    #[error("Malformed control path '{0}' (expected <Layout>/Control)")]
    Malformed(String),
}

/// What a claimed path fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AbilityTrigger {
    pub kind: AbilityKind,
    pub variant: AbilityVariant,
}

impl AbilityTrigger {
    pub fn new(kind: AbilityKind, variant: AbilityVariant) -> Self {
        Self { kind, variant }
    }
}

/// A host binding blanked by a claim, with the path it had before
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingBackup {
    pub slot: BindingSlot,
    pub original: String,
}

/// Synthetic single-button action created for one claimed path
#[derive(Debug, Clone)]
struct ClaimedPath {
    path: ControlPath,
    trigger: AbilityTrigger,
    /// In capture order
    backups: SmallVec<[BindingBackup; 4]>,
}

#[derive(Debug)]
pub struct BindingRegistry {
    /// The action set this player's claims operate on
    actions: InputActionSet,
    /// Shared definition swapped out at session start, if isolated
    original: Option<InputActionSet>,
    /// In registration order
    claims: Vec<ClaimedPath>,
}

impl BindingRegistry {
    /// Work directly on `actions`; teardown hands the restored set back.
    pub fn shared(actions: InputActionSet) -> Self {
        Self {
            actions,
            original: None,
            claims: Vec::new(),
        }
    }

    /// Work on a private copy of `shared`; teardown discards the copy and
    /// hands back the untouched shared definition.
    pub fn isolated(shared: &InputActionSet) -> Self {
        Self {
            actions: shared.clone(),
            original: Some(shared.clone()),
            claims: Vec::new(),
        }
    }

    pub fn is_isolated(&self) -> bool {
        self.original.is_some()
    }

    pub fn actions(&self) -> &InputActionSet {
        &self.actions
    }

    /// Exchange the working action set with `actions`. Used to run a shared
    /// registry against the host's live definition.
    pub fn swap_actions(&mut self, actions: &mut InputActionSet) {
        std::mem::swap(&mut self.actions, actions);
    }

    pub fn is_registered(&self, path: &ControlPath) -> bool {
        self.position(path).is_some()
    }

    /// Current owner of a claimed path
    pub fn owner(&self, path: &ControlPath) -> Option<AbilityTrigger> {
        self.position(path).map(|i| self.claims[i].trigger)
    }

    /// Claimed paths in registration order
    pub fn paths(&self) -> Vec<ControlPath> {
        self.claims.iter().map(|c| c.path.clone()).collect()
    }

    pub fn backups(&self, path: &ControlPath) -> &[BindingBackup] {
        self.position(path)
            .map(|i| self.claims[i].backups.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    fn position(&self, path: &ControlPath) -> Option<usize> {
        self.claims.iter().position(|c| c.path.eq_ignore_case(path))
    }

    /// Whether `path` can be claimed at all
    pub fn validate(path: &ControlPath) -> Result<(), BindingError> {
        if path.is_empty() {
            return Err(BindingError::Empty);
        }
        if path.layout().is_none() || path.control().is_none() {
            return Err(BindingError::Malformed(path.to_string()));
        }
        Ok(())
    }

    /// Claim `path` for `trigger`, blanking every host binding it matches.
    ///
    /// A path that is already claimed is fully released first, so each path
    /// has at most one owner.
    pub fn register(&mut self, path: &ControlPath, trigger: AbilityTrigger) -> Result<(), BindingError> {
        Self::validate(path)?;
        if self.is_registered(path) {
            debug!("Re-registering {}, releasing previous owner", path);
            self.unregister(path);
        }

        let mut backups = SmallVec::new();
        for (slot, original) in self.actions.find_matching(path) {
            self.actions.set_binding_path(slot, String::new());
            debug!("{} blanked host binding {:?} ({})", path, slot, original);
            backups.push(BindingBackup { slot, original });
        }

        self.claims.push(ClaimedPath {
            path: path.clone(),
            trigger,
            backups,
        });
        Ok(())
    }

    /// Release a claim and restore what it blanked. Unknown paths are a no-op.
    pub fn unregister(&mut self, path: &ControlPath) {
        let Some(index) = self.position(path) else {
            return;
        };
        let mut claim = self.claims.remove(index);

        while let Some(backup) = claim.backups.pop() {
            match self
                .claims
                .iter_mut()
                .find(|other| other.path.matches_binding(&backup.original))
            {
                Some(other) => {
                    debug!(
                        "{} still claimed, keeping {:?} blanked",
                        other.path, backup.slot
                    );
                    other.backups.push(backup);
                }
                None => {
                    self.actions.set_binding_path(backup.slot, backup.original);
                }
            }
        }
    }

    /// Resolve a raw press to at most one trigger.
    ///
    /// Events from devices not assigned to this player never fire.
    pub fn dispatch(&self, event: &ControlEvent, assigned: &[InputDevice]) -> Option<AbilityTrigger> {
        if !assigned.contains(&event.device) {
            return None;
        }
        self.claims
            .iter()
            .find(|c| c.path.eq_ignore_case(&event.path))
            .map(|c| c.trigger)
    }

    /// Release every claim, newest first, and hand back the action set the
    /// player should be left with.
    pub fn teardown(mut self) -> InputActionSet {
        while let Some(claim) = self.claims.last() {
            let path = claim.path.clone();
            self.unregister(&path);
        }
        match self.original.take() {
            Some(shared) => shared,
            None => self.actions,
        }
    }
}
