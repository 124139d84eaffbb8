//! Change notifications.
//!
//! A [`Change`] is emitted by the change-detection engine whenever a stored
//! input value differs from a fresh sample. It carries both the value before and
//! after, so listeners can detect edges without keeping their own history.
//!
//! ## Value conventions
//! - Digital controls (buttons, keys): `0` released, `1` pressed.
//! - Analog controls (axes, hats, triggers): the full `i16` range, centred on 0
//!   for bipolar axes (see [`crate::engine::normalize`]).
//!
//! ## Delivery
//! There is exactly one sink at a time ([`Notifier`]), owned by the
//! [`Input`](crate::input::Input) façade and lent to the active driver for the
//! duration of a poll. Notifications are delivered synchronously, in the order
//! the driver observed the samples.

use crate::device::{Device, SharedDevice};
use std::fmt;

/// One edge on one control.
#[derive(Clone)]
pub struct Change {
    /// Device whose control changed (the backend's persistent record).
    pub device: SharedDevice,
    /// Group index within `device`.
    pub group: usize,
    /// Input index within the group.
    pub input: usize,
    /// Value before the change.
    pub old: i16,
    /// Value after the change.
    pub new: i16,
}

impl Change {
    /// Name of the input that changed, if the indices are valid.
    pub fn input_name(&self) -> Option<&str> {
        self.device
            .input(self.group, self.input)
            .map(|input| input.name())
    }

    pub fn is_rising(&self) -> bool {
        self.old == 0 && self.new == 1
    }

    pub fn is_falling(&self) -> bool {
        self.old == 1 && self.new == 0
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl fmt::Debug for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Change")
            .field("device", &self.device.name())
            .field("id", &self.device.id())
            .field("group", &self.group)
            .field("input", &self.input)
            .field("old", &self.old)
            .field("new", &self.new)
            .finish()
    }
}

/// Boxed notification callback.
pub type ChangeSink = Box<dyn FnMut(&Change) + Send>;

/// Single-slot notification sink. Last registration wins.
#[derive(Default)]
pub struct Notifier {
    sink: Option<ChangeSink>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, sink: impl FnMut(&Change) + Send + 'static) {
        self.sink = Some(Box::new(sink));
    }

    pub fn clear(&mut self) {
        self.sink = None;
    }

    pub fn is_set(&self) -> bool {
        self.sink.is_some()
    }

    /// Deliver `change` to the registered sink, if any.
    pub fn notify(&mut self, change: &Change) {
        if let Some(sink) = self.sink.as_mut() {
            sink(change);
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{keyboard, Device};
    use std::sync::{Arc, Mutex};

    fn key_change(old: i16, new: i16) -> Change {
        let mut device = Device::keyboard();
        device.group_mut(keyboard::BUTTON).unwrap().append("Escape");
        Change {
            device: device.into_shared(),
            group: keyboard::BUTTON,
            input: 0,
            old,
            new,
        }
    }

    #[test]
    fn last_registration_wins() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut notifier = Notifier::new();

        let first = seen.clone();
        notifier.set(move |_| first.lock().unwrap().push("first"));
        let second = seen.clone();
        notifier.set(move |_| second.lock().unwrap().push("second"));

        notifier.notify(&key_change(0, 1));
        assert_eq!(*seen.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn cleared_notifier_is_silent() {
        let mut notifier = Notifier::new();
        notifier.set(|_| panic!("should not be called"));
        notifier.clear();
        assert!(!notifier.is_set());
        notifier.notify(&key_change(0, 1));
    }

    #[test]
    fn edge_helpers() {
        let change = key_change(0, 1);
        assert!(change.is_rising());
        assert!(!change.is_falling());
        assert_eq!(change.input_name(), Some("Escape"));
        assert!(key_change(1, 0).is_falling());
    }
}
