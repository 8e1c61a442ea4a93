//! Host input-action set and control paths
//!
//! The host game owns a set of named actions (jump, reload, melee...) each
//! bound to one or more physical control paths such as `<Keyboard>/KeyQ` or
//! `<Gamepad>/South`. Abilities claim those same paths through the
//! [`BindingRegistry`](crate::abilities::binding::BindingRegistry), which
//! blanks the matching host bindings while the claim is held.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A string identifying one physical control, `<Layout>/Control`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlPath(String);

impl ControlPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn keyboard(key: KeyCode) -> Self {
        Self(format!("<Keyboard>/{:?}", key))
    }

    pub fn gamepad(button: GamepadButton) -> Self {
        Self(format!("<Gamepad>/{:?}", button))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The `<Layout>` part without brackets, if the path is well formed.
    pub fn layout(&self) -> Option<&str> {
        let rest = self.0.strip_prefix('<')?;
        let (layout, _) = rest.split_once(">/")?;
        (!layout.is_empty()).then_some(layout)
    }

    /// The control name after the layout, if the path is well formed.
    pub fn control(&self) -> Option<&str> {
        let (_, control) = self.0.split_once(">/")?;
        (!control.is_empty()).then_some(control)
    }

    pub fn eq_ignore_case(&self, other: &ControlPath) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    /// Case-insensitive substring match against a host binding path.
    ///
    /// Composite and aliased host paths embed the plain control path, so a
    /// substring test catches them too. Blank bindings never match.
    pub fn matches_binding(&self, binding_path: &str) -> bool {
        if binding_path.is_empty() || self.is_empty() {
            return false;
        }
        binding_path
            .to_ascii_lowercase()
            .contains(&self.0.to_ascii_lowercase())
    }

    /// Short label for HUD prompts, e.g. `Q` or `South`.
    pub fn display_name(&self) -> String {
        match (self.layout(), self.control()) {
            (Some(layout), Some(control)) if layout.eq_ignore_ascii_case("keyboard") => {
                key_name(control).to_string()
            }
            (Some(_), Some(control)) => control.to_string(),
            _ => "Unbound".to_string(),
        }
    }
}

impl fmt::Display for ControlPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ControlPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Get a human-readable label for a keyboard control name
fn key_name(control: &str) -> &str {
    match control {
        "Escape" => "ESC",
        "Enter" => "ENTER",
        "Space" => "SPACE",
        "Tab" => "TAB",
        "Backspace" => "BACKSPACE",
        "ShiftLeft" => "LSHIFT",
        "ControlLeft" => "LCTRL",
        "Minus" => "-",
        "Equal" => "=",
        "ArrowUp" => "↑",
        "ArrowDown" => "↓",
        "ArrowLeft" => "←",
        "ArrowRight" => "→",
        other => other
            .strip_prefix("Key")
            .or_else(|| other.strip_prefix("Digit"))
            .unwrap_or(other),
    }
}

/// A physical device that can be assigned to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputDevice {
    Keyboard,
    Mouse,
    /// Gamepad identified by the host's device id
    Gamepad(u64),
}

impl InputDevice {
    pub fn layout(&self) -> &'static str {
        match self {
            InputDevice::Keyboard => "Keyboard",
            InputDevice::Mouse => "Mouse",
            InputDevice::Gamepad(_) => "Gamepad",
        }
    }
}

/// A raw press of one control on one device.
#[derive(Event, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEvent {
    pub device: InputDevice,
    pub path: ControlPath,
}

impl ControlEvent {
    pub fn new(device: InputDevice, path: impl Into<String>) -> Self {
        Self {
            device,
            path: ControlPath::new(path),
        }
    }
}

/// Actions the host game binds to controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameAction {
    // Movement
    Jump,
    Sprint,
    Crouch,

    // Combat
    Reload,
    Melee,
    ThrowGrenade,
    SwapWeapon,

    // Utility
    Interact,
    Ping,
    Pause,
}

impl GameAction {
    pub fn description(&self) -> &'static str {
        match self {
            GameAction::Jump => "Jump",
            GameAction::Sprint => "Sprint",
            GameAction::Crouch => "Crouch",
            GameAction::Reload => "Reload",
            GameAction::Melee => "Melee Attack",
            GameAction::ThrowGrenade => "Throw Grenade",
            GameAction::SwapWeapon => "Swap Weapon",
            GameAction::Interact => "Interact / Buy",
            GameAction::Ping => "Ping Location",
            GameAction::Pause => "Pause Menu",
        }
    }

    pub fn all() -> Vec<GameAction> {
        vec![
            GameAction::Jump,
            GameAction::Sprint,
            GameAction::Crouch,
            GameAction::Reload,
            GameAction::Melee,
            GameAction::ThrowGrenade,
            GameAction::SwapWeapon,
            GameAction::Interact,
            GameAction::Ping,
            GameAction::Pause,
        ]
    }

    /// Keyboard and gamepad paths the host binds by default.
    pub fn default_paths(&self) -> &'static [&'static str] {
        match self {
            GameAction::Jump => &["<Keyboard>/Space", "<Gamepad>/South"],
            GameAction::Sprint => &["<Keyboard>/ShiftLeft", "<Gamepad>/LeftThumb"],
            GameAction::Crouch => &["<Keyboard>/ControlLeft", "<Gamepad>/East"],
            GameAction::Reload => &["<Keyboard>/KeyR", "<Gamepad>/West"],
            GameAction::Melee => &["<Keyboard>/KeyV", "<Gamepad>/RightThumb"],
            GameAction::ThrowGrenade => &["<Keyboard>/KeyG", "<Gamepad>/RightTrigger"],
            GameAction::SwapWeapon => &["<Keyboard>/Tab", "<Gamepad>/North"],
            GameAction::Interact => &["<Keyboard>/KeyE", "<Gamepad>/DPadUp"],
            GameAction::Ping => &["<Keyboard>/KeyZ", "<Gamepad>/DPadDown"],
            GameAction::Pause => &["<Keyboard>/Escape", "<Gamepad>/Start"],
        }
    }
}

/// One binding slot of a host action. An empty path disables the slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionBinding {
    pub path: String,
}

impl ActionBinding {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn is_blank(&self) -> bool {
        self.path.is_empty()
    }
}

/// A host action with its binding slots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputAction {
    pub action: GameAction,
    pub bindings: Vec<ActionBinding>,
    pub enabled: bool,
}

impl InputAction {
    pub fn new(action: GameAction, paths: &[&str]) -> Self {
        Self {
            action,
            bindings: paths.iter().map(|p| ActionBinding::new(*p)).collect(),
            enabled: true,
        }
    }
}

/// Location of a binding slot inside an [`InputActionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingSlot {
    pub action_index: usize,
    pub binding_index: usize,
}

/// The complete action set of one player (or the shared definition several
/// local players start from).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputActionSet {
    actions: Vec<InputAction>,
}

impl Default for InputActionSet {
    fn default() -> Self {
        Self::create_defaults()
    }
}

impl InputActionSet {
    pub fn new(actions: Vec<InputAction>) -> Self {
        Self { actions }
    }

    /// Create the default gameplay bindings
    pub fn create_defaults() -> Self {
        let actions = GameAction::all()
            .into_iter()
            .map(|action| InputAction::new(action, action.default_paths()))
            .collect();
        Self { actions }
    }

    pub fn actions(&self) -> &[InputAction] {
        &self.actions
    }

    pub fn action(&self, action: GameAction) -> Option<&InputAction> {
        self.actions.iter().find(|a| a.action == action)
    }

    pub fn action_mut(&mut self, action: GameAction) -> Option<&mut InputAction> {
        self.actions.iter_mut().find(|a| a.action == action)
    }

    pub fn binding_path(&self, slot: BindingSlot) -> Option<&str> {
        self.actions
            .get(slot.action_index)?
            .bindings
            .get(slot.binding_index)
            .map(|b| b.path.as_str())
    }

    /// Overwrite a binding slot's path. Returns false if the slot does not exist.
    pub fn set_binding_path(&mut self, slot: BindingSlot, path: impl Into<String>) -> bool {
        match self
            .actions
            .get_mut(slot.action_index)
            .and_then(|a| a.bindings.get_mut(slot.binding_index))
        {
            Some(binding) => {
                binding.path = path.into();
                true
            }
            None => false,
        }
    }

    /// Every non-blank binding slot whose path matches `path`.
    pub fn find_matching(&self, path: &ControlPath) -> Vec<(BindingSlot, String)> {
        let mut found = Vec::new();
        for (action_index, action) in self.actions.iter().enumerate() {
            for (binding_index, binding) in action.bindings.iter().enumerate() {
                if path.matches_binding(&binding.path) {
                    found.push((
                        BindingSlot {
                            action_index,
                            binding_index,
                        },
                        binding.path.clone(),
                    ));
                }
            }
        }
        found
    }

    /// Host actions fired by a press of `path`.
    ///
    /// Disabled actions and blanked bindings never fire.
    pub fn triggered_by(&self, path: &ControlPath) -> Vec<GameAction> {
        self.actions
            .iter()
            .filter(|a| a.enabled)
            .filter(|a| {
                a.bindings
                    .iter()
                    .any(|b| !b.is_blank() && b.path.eq_ignore_ascii_case(path.as_str()))
            })
            .map(|a| a.action)
            .collect()
    }

    /// Check if a path is already bound to any action (for conflict detection)
    pub fn is_path_bound(&self, path: &ControlPath, exclude_action: Option<GameAction>) -> Option<GameAction> {
        self.actions
            .iter()
            .filter(|a| Some(a.action) != exclude_action)
            .find(|a| a.bindings.iter().any(|b| path.matches_binding(&b.path)))
            .map(|a| a.action)
    }

    /// Get display string for an action's bindings
    pub fn binding_display(&self, action: GameAction) -> String {
        let labels: Vec<String> = self
            .action(action)
            .map(|a| {
                a.bindings
                    .iter()
                    .filter(|b| !b.is_blank())
                    .map(|b| ControlPath::new(b.path.clone()).display_name())
                    .collect()
            })
            .unwrap_or_default();
        if labels.is_empty() {
            "Unbound".to_string()
        } else {
            labels.join(" / ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_path_format() {
        let path = ControlPath::keyboard(KeyCode::KeyQ);
        assert_eq!(path.as_str(), "<Keyboard>/KeyQ");
        assert_eq!(path.layout(), Some("Keyboard"));
        assert_eq!(path.control(), Some("KeyQ"));
        assert_eq!(path.display_name(), "Q");
    }

    #[test]
    fn test_gamepad_path_format() {
        let path = ControlPath::gamepad(GamepadButton::South);
        assert_eq!(path.as_str(), "<Gamepad>/South");
        assert_eq!(path.display_name(), "South");
    }

    #[test]
    fn test_malformed_path_has_no_parts() {
        let path = ControlPath::new("KeyQ");
        assert_eq!(path.layout(), None);
        assert_eq!(path.control(), None);
        assert_eq!(path.display_name(), "Unbound");
    }

    #[test]
    fn test_matches_binding_is_case_insensitive_substring() {
        let path = ControlPath::new("<keyboard>/keyr");
        assert!(path.matches_binding("<Keyboard>/KeyR"));
        assert!(path.matches_binding("OneModifier(<Keyboard>/ShiftLeft,<Keyboard>/KeyR)"));
        assert!(!path.matches_binding(""));
        assert!(!path.matches_binding("<Keyboard>/KeyE"));
    }

    #[test]
    fn test_triggered_by_skips_blank_and_disabled() {
        let mut set = InputActionSet::create_defaults();
        let reload = ControlPath::new("<Keyboard>/KeyR");
        assert_eq!(set.triggered_by(&reload), vec![GameAction::Reload]);

        let (slot, _) = set.find_matching(&reload)[0].clone();
        set.set_binding_path(slot, "");
        assert!(set.triggered_by(&reload).is_empty());

        let jump = ControlPath::new("<Gamepad>/South");
        set.action_mut(GameAction::Jump).unwrap().enabled = false;
        assert!(set.triggered_by(&jump).is_empty());
    }

    #[test]
    fn test_is_path_bound_conflict_detection() {
        let set = InputActionSet::create_defaults();
        let path = ControlPath::new("<Keyboard>/KeyE");
        assert_eq!(set.is_path_bound(&path, None), Some(GameAction::Interact));
        assert_eq!(set.is_path_bound(&path, Some(GameAction::Interact)), None);
    }

    #[test]
    fn test_binding_display() {
        let set = InputActionSet::create_defaults();
        assert_eq!(set.binding_display(GameAction::Reload), "R / West");
    }
}
