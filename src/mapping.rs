//! Logical-to-physical input bindings.
//!
//! An [`InputMapping`] binds one logical control ("Start", "A", "Fast Forward")
//! to one physical control, optionally qualified to one half of a bipolar axis.
//!
//! The durable form of a binding is its **assignment string**
//! (`<Device>/<IdHex>/<Group>/<Input>[/<Qualifier>]`, see [`Assignment`]). The
//! resolved `(device, group, input, qualifier)` tuple is a cache of that string:
//! [`InputMapping::resolve`] rebuilds it against the current device table, and a
//! disconnect clears the cache without touching the string.
//!
//! ## Live capture
//! While an application listens for "the next press", every change notification
//! is offered to [`InputMapping::bind`]. The decision is a fixed rule table
//! evaluated top to bottom ([`classify`]); cancel gestures come before commit
//! gestures.

use crate::device::{joypad, Device, DeviceId, SharedDevice};
use crate::error::{Error, Result};
use crate::event::Change;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Deflection an analog control must exceed to count as a half-axis press.
pub const THRESHOLD: i16 = 16384;

/// Which reading of a control a binding refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Qualifier {
    /// The raw value.
    #[default]
    None,
    /// Pressed while below `-THRESHOLD`.
    Lo,
    /// Pressed while above `+THRESHOLD`.
    Hi,
}

impl Qualifier {
    /// Text used in assignment strings; `None` has no text.
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Qualifier::None => None,
            Qualifier::Lo => Some("Lo"),
            Qualifier::Hi => Some("Hi"),
        }
    }

    /// Unknown text reads as `None`.
    pub fn parse(text: &str) -> Self {
        match text {
            "Lo" => Qualifier::Lo,
            "Hi" => Qualifier::Hi,
            _ => Qualifier::None,
        }
    }

    /// Read `value` through this qualifier.
    pub fn apply(self, value: i16) -> i16 {
        match self {
            Qualifier::None => value,
            Qualifier::Lo => i16::from(value < -THRESHOLD),
            Qualifier::Hi => i16::from(value > THRESHOLD),
        }
    }
}

/// Parsed form of an assignment string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub device: String,
    pub device_id: DeviceId,
    pub group: String,
    pub input: String,
    pub qualifier: Qualifier,
}

impl FromStr for Assignment {
    type Err = Error;

    /// Empty fields are skipped, so a trailing `/` is harmless.
    fn from_str(text: &str) -> Result<Self> {
        let fields: Vec<&str> = text.split('/').filter(|f| !f.is_empty()).collect();
        if fields.len() < 4 {
            return Err(Error::TooFewFields(fields.len()));
        }
        let device_id = DeviceId::from_hex(fields[1])
            .ok_or_else(|| Error::InvalidDeviceId(fields[1].to_string()))?;

        Ok(Self {
            device: fields[0].to_string(),
            device_id,
            group: fields[2].to_string(),
            input: fields[3].to_string(),
            qualifier: fields.get(4).map_or(Qualifier::None, |q| Qualifier::parse(q)),
        })
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.device, self.device_id, self.group, self.input
        )?;
        if let Some(qualifier) = self.qualifier.as_str() {
            write!(f, "/{qualifier}")?;
        }
        Ok(())
    }
}

/// A notification offered to a listening mapping.
#[derive(Clone, Copy, Debug)]
pub struct Capture<'a> {
    pub device: &'a Device,
    pub group: usize,
    pub input: usize,
    pub old: i16,
    pub new: i16,
}

impl Capture<'_> {
    fn rising(&self) -> bool {
        self.old == 0 && self.new == 1
    }

    fn analog(&self) -> bool {
        matches!(self.group, joypad::AXIS | joypad::HAT | joypad::TRIGGER)
    }

    fn input_name(&self) -> Option<&str> {
        self.device
            .input(self.group, self.input)
            .map(|input| input.name())
    }
}

/// Outcome of a matching capture rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindAction {
    /// Stop listening and unbind.
    Cancel,
    /// Bind to the offered control with this qualifier.
    Commit(Qualifier),
}

struct BindRule {
    applies: fn(&Capture<'_>) -> bool,
    action: BindAction,
}

fn null_device(c: &Capture<'_>) -> bool {
    c.device.is_null()
}

fn escape_key(c: &Capture<'_>) -> bool {
    c.device.is_keyboard() && c.input_name() == Some("Escape")
}

fn key_press(c: &Capture<'_>) -> bool {
    c.device.is_keyboard() && c.rising()
}

fn joypad_button_press(c: &Capture<'_>) -> bool {
    c.device.is_joypad() && c.group == joypad::BUTTON && c.rising()
}

fn joypad_low_deflection(c: &Capture<'_>) -> bool {
    c.device.is_joypad() && c.analog() && c.new < -THRESHOLD
}

fn joypad_high_deflection(c: &Capture<'_>) -> bool {
    c.device.is_joypad() && c.analog() && c.new > THRESHOLD
}

/// First match wins.
const BIND_RULES: &[BindRule] = &[
    BindRule { applies: null_device, action: BindAction::Cancel },
    BindRule { applies: escape_key, action: BindAction::Cancel },
    BindRule { applies: key_press, action: BindAction::Commit(Qualifier::None) },
    BindRule { applies: joypad_button_press, action: BindAction::Commit(Qualifier::None) },
    BindRule { applies: joypad_low_deflection, action: BindAction::Commit(Qualifier::Lo) },
    BindRule { applies: joypad_high_deflection, action: BindAction::Commit(Qualifier::Hi) },
];

/// Decide what a listening mapping does with `capture`; `None` means keep
/// listening.
pub fn classify(capture: &Capture<'_>) -> Option<BindAction> {
    BIND_RULES
        .iter()
        .find(|rule| (rule.applies)(capture))
        .map(|rule| rule.action)
}

/// One logical control and what it is bound to.
#[derive(Clone, Debug)]
pub struct InputMapping {
    name: String,
    device: Option<SharedDevice>,
    device_id: DeviceId,
    group: usize,
    input: usize,
    qualifier: Qualifier,
    assignment: String,
}

impl InputMapping {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device: None,
            device_id: DeviceId::default(),
            group: 0,
            input: 0,
            qualifier: Qualifier::None,
            assignment: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offer a notification while listening. Returns `true` if it was consumed
    /// (the binding was committed or cancelled).
    ///
    /// A cancel only unbinds; the assignment string is left for the caller to
    /// keep or [`reset`](Self::reset_assignment).
    pub fn bind(
        &mut self,
        device: &SharedDevice,
        group: usize,
        input: usize,
        old: i16,
        new: i16,
    ) -> bool {
        let capture = Capture {
            device,
            group,
            input,
            old,
            new,
        };
        self.capture(device, &capture).is_some()
    }

    /// [`bind`](Self::bind) taking a whole [`Change`], reporting which action
    /// consumed it.
    pub fn bind_change(&mut self, change: &Change) -> Option<BindAction> {
        let capture = Capture {
            device: &change.device,
            group: change.group,
            input: change.input,
            old: change.old,
            new: change.new,
        };
        self.capture(&change.device, &capture)
    }

    fn capture(&mut self, device: &SharedDevice, capture: &Capture<'_>) -> Option<BindAction> {
        match classify(capture)? {
            BindAction::Cancel => {
                debug!(mapping = %self.name, "binding cancelled");
                self.unbind();
                Some(BindAction::Cancel)
            }
            BindAction::Commit(qualifier) => self
                .set_assignment(device, capture.group, capture.input, qualifier)
                .then_some(BindAction::Commit(qualifier)),
        }
    }

    /// Rebuild the bound state from the assignment string against `devices`.
    ///
    /// A miss (nothing assigned, unparseable text, device not plugged, group or
    /// input not found) leaves the mapping unbound with its assignment intact.
    pub fn resolve(&mut self, devices: &[SharedDevice]) -> bool {
        self.unbind();

        let assignment = match self.assignment.parse::<Assignment>() {
            Ok(assignment) => assignment,
            Err(err) => {
                if !self.assignment.is_empty() {
                    debug!(mapping = %self.name, %err, "ignoring unparseable assignment");
                }
                return false;
            }
        };

        for device in devices {
            if device.name() != assignment.device || device.id() != assignment.device_id {
                continue;
            }
            let Some(group) = device.find(&assignment.group) else {
                continue;
            };
            let Some(input) = device.group(group).and_then(|g| g.find(&assignment.input)) else {
                continue;
            };
            self.commit(device, group, input, assignment.qualifier);
            return true;
        }

        debug!(mapping = %self.name, assignment = %self.assignment, "assignment not resolvable");
        false
    }

    /// Clear the resolved state. The assignment string is kept.
    pub fn unbind(&mut self) {
        self.device = None;
        self.device_id = DeviceId::default();
        self.group = 0;
        self.input = 0;
        self.qualifier = Qualifier::None;
    }

    /// Bind to `device[group][input]` and rewrite the assignment string.
    /// Returns `false` (and changes nothing) if the indices are invalid.
    pub fn set_assignment(
        &mut self,
        device: &SharedDevice,
        group: usize,
        input: usize,
        qualifier: Qualifier,
    ) -> bool {
        let Some(group_ref) = device.group(group) else {
            return false;
        };
        let Some(input_ref) = group_ref.input(input) else {
            return false;
        };

        self.assignment = Assignment {
            device: device.name().to_string(),
            device_id: device.id(),
            group: group_ref.name().to_string(),
            input: input_ref.name().to_string(),
            qualifier,
        }
        .to_string();
        self.commit(device, group, input, qualifier);
        debug!(mapping = %self.name, assignment = %self.assignment, "binding assigned");
        true
    }

    /// Forget the binding entirely.
    pub fn reset_assignment(&mut self) {
        self.unbind();
        self.assignment.clear();
    }

    pub fn assignment(&self) -> &str {
        &self.assignment
    }

    /// Replace the assignment string (e.g. from a stored profile). The mapping
    /// is left unbound until the next [`resolve`](Self::resolve).
    pub fn set_assignment_text(&mut self, assignment: impl Into<String>) {
        self.unbind();
        self.assignment = assignment.into();
    }

    pub fn is_bound(&self) -> bool {
        self.device.is_some()
    }

    pub fn device(&self) -> Option<&SharedDevice> {
        self.device.as_ref()
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn group(&self) -> usize {
        self.group
    }

    pub fn input(&self) -> usize {
        self.input
    }

    pub fn qualifier(&self) -> Qualifier {
        self.qualifier
    }

    /// Whether `change` is about the control this mapping is bound to.
    pub fn matches(&self, change: &Change) -> bool {
        match &self.device {
            Some(device) => {
                Arc::ptr_eq(device, &change.device)
                    && self.group == change.group
                    && self.input == change.input
            }
            None => false,
        }
    }

    /// Current reading through the qualifier; 0 when unbound.
    pub fn value(&self) -> i16 {
        self.device
            .as_ref()
            .and_then(|device| device.input(self.group, self.input))
            .map_or(0, |input| self.qualifier.apply(input.value()))
    }

    /// `raw` reduced to 0/1 through the qualifier.
    pub fn logical(&self, raw: i16) -> i16 {
        i16::from(self.qualifier.apply(raw) != 0)
    }

    /// Human-readable description of the binding; empty when unbound.
    pub fn text(&self) -> String {
        let Some(device) = &self.device else {
            return String::new();
        };
        let Some(group) = device.group(self.group) else {
            return String::new();
        };
        let Some(input) = group.input(self.input) else {
            return String::new();
        };

        let mut text = format!("{} {} {}", device.name(), group.name(), input.name());
        if let Some(qualifier) = self.qualifier.as_str() {
            text.push(' ');
            text.push_str(qualifier);
        }
        text
    }

    fn commit(&mut self, device: &SharedDevice, group: usize, input: usize, qualifier: Qualifier) {
        self.device = Some(Arc::clone(device));
        self.device_id = device.id();
        self.group = group;
        self.input = input;
        self.qualifier = qualifier;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{keyboard, mouse};

    fn joypad_device(id: DeviceId) -> SharedDevice {
        let mut pad = Device::joypad();
        pad.set_id(id);
        for (group, count) in [(joypad::AXIS, 2), (joypad::HAT, 1), (joypad::TRIGGER, 1), (joypad::BUTTON, 4)] {
            let group = pad.group_mut(group).unwrap();
            for n in 0..count {
                group.append(n.to_string());
            }
        }
        pad.into_shared()
    }

    fn keyboard_device() -> SharedDevice {
        let mut keys = Device::keyboard();
        let buttons = keys.group_mut(keyboard::BUTTON).unwrap();
        buttons.append("Escape");
        buttons.append("Enter");
        keys.into_shared()
    }

    fn capture(device: &Device, group: usize, input: usize, old: i16, new: i16) -> Option<BindAction> {
        classify(&Capture {
            device,
            group,
            input,
            old,
            new,
        })
    }

    #[test]
    fn rules_in_precedence_order() {
        let pad = joypad_device(DeviceId::new(1));
        let keys = keyboard_device();
        let null = Device::null();
        let rodent = Device::mouse();

        assert_eq!(capture(&null, 0, 0, 0, 1), Some(BindAction::Cancel));
        // Escape cancels even on a rising edge.
        assert_eq!(capture(&keys, keyboard::BUTTON, 0, 0, 1), Some(BindAction::Cancel));
        assert_eq!(capture(&keys, keyboard::BUTTON, 0, 1, 0), Some(BindAction::Cancel));
        assert_eq!(
            capture(&keys, keyboard::BUTTON, 1, 0, 1),
            Some(BindAction::Commit(Qualifier::None))
        );
        assert_eq!(capture(&keys, keyboard::BUTTON, 1, 1, 0), None);
        assert_eq!(
            capture(&pad, joypad::BUTTON, 2, 0, 1),
            Some(BindAction::Commit(Qualifier::None))
        );
        assert_eq!(capture(&pad, joypad::BUTTON, 2, 1, 0), None);
        assert_eq!(capture(&rodent, mouse::BUTTON, 0, 0, 1), None);
    }

    #[test]
    fn analog_thresholds_are_strict() {
        let pad = joypad_device(DeviceId::new(1));
        for group in [joypad::AXIS, joypad::HAT, joypad::TRIGGER] {
            assert_eq!(capture(&pad, group, 0, 0, -16384), None);
            assert_eq!(capture(&pad, group, 0, 0, 16384), None);
            assert_eq!(
                capture(&pad, group, 0, 0, -16385),
                Some(BindAction::Commit(Qualifier::Lo))
            );
            assert_eq!(
                capture(&pad, group, 0, 0, 16385),
                Some(BindAction::Commit(Qualifier::Hi))
            );
        }
    }

    #[test]
    fn assignment_format() {
        let text = "Joypad/00010002deadbeef/Axis/0/Lo";
        let parsed: Assignment = text.parse().unwrap();
        assert_eq!(parsed.device, "Joypad");
        assert_eq!(parsed.device_id, DeviceId::from_parts(0x0001_0002, 0xdead, 0xbeef));
        assert_eq!(parsed.group, "Axis");
        assert_eq!(parsed.input, "0");
        assert_eq!(parsed.qualifier, Qualifier::Lo);
        assert_eq!(parsed.to_string(), text);

        let plain: Assignment = "Keyboard/0000000000000001/Button/Enter/".parse().unwrap();
        assert_eq!(plain.qualifier, Qualifier::None);
        assert_eq!(plain.to_string(), "Keyboard/0000000000000001/Button/Enter");
    }

    #[test]
    fn malformed_assignments() {
        assert!(matches!(
            "Joypad/0001/Axis".parse::<Assignment>(),
            Err(Error::TooFewFields(3))
        ));
        assert!(matches!("".parse::<Assignment>(), Err(Error::TooFewFields(0))));
        assert!(matches!(
            "Joypad/xyz/Axis/0".parse::<Assignment>(),
            Err(Error::InvalidDeviceId(_))
        ));
        let odd: Assignment = "Joypad/1/Axis/0/Sideways".parse().unwrap();
        assert_eq!(odd.qualifier, Qualifier::None);
    }

    #[test]
    fn resolves_only_against_matching_device() {
        let id = DeviceId::from_hex("00010002deadbeef").unwrap();
        let mut mapping = InputMapping::new("Left");
        mapping.set_assignment_text("Joypad/00010002deadbeef/Axis/0/Lo");

        assert!(!mapping.resolve(&[]));
        assert!(!mapping.is_bound());

        let other = joypad_device(DeviceId::new(42));
        assert!(!mapping.resolve(&[other.clone()]));

        let pad = joypad_device(id);
        assert!(mapping.resolve(&[other, pad.clone()]));
        assert!(mapping.is_bound());
        assert!(Arc::ptr_eq(mapping.device().unwrap(), &pad));
        assert_eq!(mapping.device_id(), id);
        assert_eq!(mapping.group(), joypad::AXIS);
        assert_eq!(mapping.input(), 0);
        assert_eq!(mapping.qualifier(), Qualifier::Lo);
    }

    #[test]
    fn resolve_misses_on_unknown_input() {
        let id = DeviceId::new(5);
        let mut mapping = InputMapping::new("A");
        mapping.set_assignment_text(format!("Joypad/{id}/Button/9"));
        assert!(!mapping.resolve(&[joypad_device(id)]));
        assert_eq!(mapping.assignment(), "Joypad/0000000000000005/Button/9");
    }

    #[test]
    fn round_trip_through_assignment() {
        let pad = joypad_device(DeviceId::from_parts(7, 0x045e, 0x028e));
        for (group, input, qualifier) in [
            (joypad::BUTTON, 3, Qualifier::None),
            (joypad::AXIS, 1, Qualifier::Hi),
            (joypad::HAT, 0, Qualifier::Lo),
        ] {
            let mut mapping = InputMapping::new("X");
            assert!(mapping.set_assignment(&pad, group, input, qualifier));

            let mut restored = InputMapping::new("X");
            restored.set_assignment_text(mapping.assignment());
            assert!(restored.resolve(&[pad.clone()]));
            assert_eq!(
                (restored.group(), restored.input(), restored.qualifier()),
                (group, input, qualifier)
            );
        }
    }

    #[test]
    fn unbind_keeps_the_assignment() {
        let pad = joypad_device(DeviceId::new(3));
        let mut mapping = InputMapping::new("B");
        mapping.set_assignment(&pad, joypad::BUTTON, 1, Qualifier::None);
        let text = mapping.assignment().to_string();

        mapping.unbind();
        assert!(!mapping.is_bound());
        assert_eq!(mapping.device_id(), DeviceId::default());
        assert_eq!(mapping.assignment(), text);

        // The device went away: the string survives for a later reconnect.
        assert!(!mapping.resolve(&[]));
        assert_eq!(mapping.assignment(), text);
        assert!(mapping.resolve(&[pad]));
    }

    #[test]
    fn escape_cancel_unbinds_but_keeps_the_string() {
        let pad = joypad_device(DeviceId::new(3));
        let keys = keyboard_device();
        let mut mapping = InputMapping::new("Start");
        mapping.set_assignment(&pad, joypad::BUTTON, 3, Qualifier::None);
        let text = mapping.assignment().to_string();

        assert!(mapping.bind(&keys, keyboard::BUTTON, 0, 0, 1));
        assert!(!mapping.is_bound());
        assert_eq!(mapping.assignment(), text);
    }

    #[test]
    fn bind_change_reports_the_action() {
        let pad = joypad_device(DeviceId::new(4));
        let keys = keyboard_device();
        let mut mapping = InputMapping::new("Select");
        let change = |device: &SharedDevice, group, input, new| Change {
            device: device.clone(),
            group,
            input,
            old: 0,
            new,
        };

        assert_eq!(mapping.bind_change(&change(&pad, joypad::BUTTON, 0, 0)), None);
        assert_eq!(
            mapping.bind_change(&change(&pad, joypad::TRIGGER, 0, 20000)),
            Some(BindAction::Commit(Qualifier::Hi))
        );
        assert_eq!(
            mapping.bind_change(&change(&keys, keyboard::BUTTON, 0, 1)),
            Some(BindAction::Cancel)
        );
        assert_eq!(mapping.assignment(), "Joypad/0000000000000004/Trigger/0/Hi");
    }

    #[test]
    fn live_bind_commits_first_significant_gesture() {
        let pad = joypad_device(DeviceId::new(8));
        let mut mapping = InputMapping::new("Up");

        assert!(!mapping.bind(&pad, joypad::AXIS, 1, 0, -9000));
        assert!(!mapping.is_bound());
        assert!(mapping.bind(&pad, joypad::AXIS, 1, -9000, -20000));
        assert!(mapping.is_bound());
        assert_eq!(mapping.qualifier(), Qualifier::Lo);
        assert_eq!(mapping.assignment(), "Joypad/0000000000000008/Axis/1/Lo");
        assert_eq!(mapping.text(), "Joypad Axis 1 Lo");
    }

    #[test]
    fn value_reads_through_qualifier() {
        let pad = joypad_device(DeviceId::new(9));
        let mut mapping = InputMapping::new("Right");
        assert_eq!(mapping.value(), 0);

        mapping.set_assignment(&pad, joypad::AXIS, 0, Qualifier::Hi);
        pad.input(joypad::AXIS, 0).unwrap().set_value(30000);
        assert_eq!(mapping.value(), 1);
        pad.input(joypad::AXIS, 0).unwrap().set_value(-30000);
        assert_eq!(mapping.value(), 0);

        assert_eq!(mapping.logical(16385), 1);
        assert_eq!(mapping.logical(16384), 0);
    }

    #[test]
    fn matches_only_the_bound_control() {
        let pad = joypad_device(DeviceId::new(2));
        let twin = joypad_device(DeviceId::new(2));
        let mut mapping = InputMapping::new("A");
        mapping.set_assignment(&pad, joypad::BUTTON, 0, Qualifier::None);

        let change = |device: &SharedDevice, input| Change {
            device: device.clone(),
            group: joypad::BUTTON,
            input,
            old: 0,
            new: 1,
        };
        assert!(mapping.matches(&change(&pad, 0)));
        assert!(!mapping.matches(&change(&pad, 1)));
        assert!(!mapping.matches(&change(&twin, 0)));
    }
}
