//! Serializable binding profiles.
//!
//! A profile is nothing but assignment strings keyed by logical control name.
//! Devices are never stored: applying a profile only sets the strings, and the
//! next [`resolve`](crate::mapping::InputMapping::resolve) decides what is
//! actually bound.
use crate::error::Result;
use crate::hotkey::{Hotkey, PadButton, VirtualPad};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Named set of assignment strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Pad button name (`"Start"`, `"A"`, ...) to assignment string.
    #[serde(default)]
    pub pad: BTreeMap<String, String>,
    /// Hotkey name to assignment string.
    #[serde(default)]
    pub hotkeys: BTreeMap<String, String>,
}

impl BindingProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Record the current assignments. Unassigned controls are left out.
    pub fn capture(name: impl Into<String>, pad: &VirtualPad, hotkeys: &[Hotkey]) -> Self {
        let mut profile = Self::new(name);
        for (button, mapping) in PadButton::ALL.into_iter().zip(pad.mappings()) {
            if !mapping.assignment().is_empty() {
                profile
                    .pad
                    .insert(button.name().to_string(), mapping.assignment().to_string());
            }
        }
        for hotkey in hotkeys {
            let assignment = hotkey.mapping().assignment();
            if !assignment.is_empty() {
                profile
                    .hotkeys
                    .insert(hotkey.name().to_string(), assignment.to_string());
            }
        }
        profile
    }

    /// Load the assignments into `pad` and `hotkeys`.
    ///
    /// Every pad button takes the profile's string, or none if the profile
    /// omits it. Hotkeys not named by the profile are cleared as well. All
    /// touched mappings are left unbound until re-resolved.
    pub fn apply(&self, pad: &mut VirtualPad, hotkeys: &mut [Hotkey]) {
        self.apply_pad(pad);
        self.apply_hotkeys(hotkeys);
    }

    pub fn apply_pad(&self, pad: &mut VirtualPad) {
        for name in self.pad.keys() {
            if PadButton::from_name(name).is_none() {
                warn!(profile = %self.name, button = %name, "profile names an unknown pad button");
            }
        }
        for button in PadButton::ALL {
            let assignment = self.pad.get(button.name()).cloned().unwrap_or_default();
            pad.get_mut(button).set_assignment_text(assignment);
        }
    }

    pub fn apply_hotkeys(&self, hotkeys: &mut [Hotkey]) {
        for name in self.hotkeys.keys() {
            if !hotkeys.iter().any(|hotkey| hotkey.name() == name) {
                warn!(profile = %self.name, hotkey = %name, "profile names an unknown hotkey");
            }
        }
        for hotkey in hotkeys.iter_mut() {
            let assignment = self.hotkeys.get(hotkey.name()).cloned().unwrap_or_default();
            hotkey.mapping_mut().set_assignment_text(assignment);
        }
    }

    /// Assignment stored for the hotkey called `name`.
    pub fn hotkey(&self, name: &str) -> Option<&str> {
        self.hotkeys.get(name).map(String::as_str)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const START: &str = "Joypad/00010002deadbeef/Button/3";
    const LEFT: &str = "Joypad/00010002deadbeef/Axis/0/Lo";

    #[test]
    fn capture_skips_unassigned() {
        let mut pad = VirtualPad::new();
        pad.start.set_assignment_text(START);
        let mut hotkeys = vec![Hotkey::new("Fast Forward"), Hotkey::new("Pause")];
        hotkeys[1].mapping_mut().set_assignment_text(LEFT);

        let profile = BindingProfile::capture("mine", &pad, &hotkeys);
        assert_eq!(profile.pad.len(), 1);
        assert_eq!(profile.pad["Start"], START);
        assert_eq!(profile.hotkeys.len(), 1);
        assert_eq!(profile.hotkeys["Pause"], LEFT);
    }

    #[test]
    fn apply_replaces_everything() {
        let mut pad = VirtualPad::new();
        pad.a.set_assignment_text(START);
        let mut hotkeys = vec![Hotkey::new("Pause")];
        hotkeys[0].mapping_mut().set_assignment_text(START);

        let mut profile = BindingProfile::new("fresh");
        profile.pad.insert("Left".into(), LEFT.into());
        profile.pad.insert("Turbo".into(), START.into());
        profile.apply(&mut pad, &mut hotkeys);

        assert_eq!(pad.left.assignment(), LEFT);
        assert_eq!(pad.a.assignment(), "");
        assert_eq!(hotkeys[0].mapping().assignment(), "");
    }

    #[test]
    fn toml_form() {
        let mut profile = BindingProfile::new("arcade");
        profile.description = Some("stick on the left".into());
        profile.pad.insert("Start".into(), START.into());
        profile.hotkeys.insert("Pause".into(), LEFT.into());

        let text = profile.to_toml_string().unwrap();
        assert!(text.contains("[pad]"));
        assert_eq!(BindingProfile::from_toml_str(&text).unwrap(), profile);

        let minimal = BindingProfile::from_toml_str("name = \"bare\"").unwrap();
        assert_eq!(minimal, BindingProfile::new("bare"));
    }

    #[test]
    fn json_form() {
        let mut profile = BindingProfile::new("pad");
        profile.pad.insert("A".into(), START.into());
        let text = profile.to_json_string().unwrap();
        assert_eq!(BindingProfile::from_json_str(&text).unwrap(), profile);
        assert!(matches!(
            BindingProfile::from_json_str("{\"pad\": {}}"),
            Err(Error::Json(_))
        ));
    }
}
