//! Application-level composition.
//!
//! [`InputManager`] owns the [`Input`] façade, the latest device table, a
//! [`VirtualPad`] and any number of [`Hotkey`]s, and wires them together:
//!
//! 1. `poll()` asks the façade for a fresh snapshot; change notifications are
//!    queued on an internal channel while the driver runs.
//! 2. If the device table changed, every mapping is re-resolved from its
//!    assignment string.
//! 3. Queued notifications are dispatched in order, first to the mapping that
//!    is listening for a new binding (if any), otherwise to the hotkeys.
use crate::binding::BindingProfile;
use crate::config::InputConfig;
use crate::device::{DeviceId, SharedDevice};
use crate::event::Change;
use crate::hotkey::{Hotkey, PadButton, VirtualPad};
use crate::input::Input;
use crate::mapping::{BindAction, InputMapping};
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Mapping that captures the next significant gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindTarget {
    Pad(PadButton),
    /// Index into [`InputManager::hotkeys`].
    Hotkey(usize),
}

pub struct InputManager {
    input: Input,
    driver: String,
    poll_interval: Duration,
    last_poll: Option<Instant>,
    devices: Vec<SharedDevice>,
    profile: BindingProfile,
    sender: Sender<Change>,
    changes: Receiver<Change>,
    pad: VirtualPad,
    hotkeys: Vec<Hotkey>,
    listening: Option<BindTarget>,
}

impl InputManager {
    /// Wrap `input`. The configured profile is loaded into the pad right away;
    /// nothing is polled until [`create`](Self::create).
    pub fn new(input: Input, config: &InputConfig) -> Self {
        let (sender, changes) = mpsc::channel();
        let mut pad = VirtualPad::new();
        config.profile.apply_pad(&mut pad);

        Self {
            input,
            driver: config.driver.clone(),
            poll_interval: config.poll_interval(),
            last_poll: None,
            devices: Vec::new(),
            profile: config.profile.clone(),
            sender,
            changes,
            pad,
            hotkeys: Vec::new(),
            listening: None,
        }
    }

    /// Select the configured driver, hook up change delivery, take a first
    /// snapshot and resolve every mapping.
    pub fn create(&mut self) -> bool {
        self.listening = None;
        let created = self.input.create(&self.driver);

        let sender = self.sender.clone();
        self.input.on_change(move |change| {
            // The receiver lives as long as the manager that owns the sink.
            let _ = sender.send(change.clone());
        });

        self.devices = self.input.poll();
        self.last_poll = Some(Instant::now());
        // Startup state is read by `bind` below, not replayed as edges.
        while self.changes.try_recv().is_ok() {}

        let bound = self.bind();
        info!(
            driver = self.input.driver(),
            devices = self.devices.len(),
            bound,
            "input manager ready"
        );
        created
    }

    /// Poll the driver if the poll interval has elapsed. Returns whether a
    /// poll actually happened.
    pub fn poll(&mut self) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last_poll {
            if now.duration_since(last) < self.poll_interval {
                return false;
            }
        }
        self.last_poll = Some(now);

        let devices = self.input.poll();
        if churned(&self.devices, &devices) {
            debug!(
                before = self.devices.len(),
                after = devices.len(),
                "device table changed"
            );
            self.devices = devices;
            self.bind();
        } else {
            self.devices = devices;
        }

        while let Ok(change) = self.changes.try_recv() {
            self.dispatch(&change);
        }
        true
    }

    /// Re-resolve every mapping against the current device table and bring
    /// hotkeys in line with the live values. Returns how many mappings are
    /// bound.
    pub fn bind(&mut self) -> usize {
        let mut bound = self.pad.bind(&self.devices);
        for hotkey in &mut self.hotkeys {
            if hotkey.mapping_mut().resolve(&self.devices) {
                bound += 1;
            }
            hotkey.sync();
        }
        bound
    }

    /// Start capturing the next gesture into `target`. Returns `false` for a
    /// hotkey index out of range.
    pub fn listen(&mut self, target: BindTarget) -> bool {
        if let BindTarget::Hotkey(index) = target {
            if index >= self.hotkeys.len() {
                return false;
            }
        }
        debug!(?target, "listening for binding");
        self.listening = Some(target);
        true
    }

    pub fn cancel_listening(&mut self) {
        if let Some(target) = self.listening.take() {
            debug!(?target, "stopped listening");
        }
    }

    pub fn listening(&self) -> Option<BindTarget> {
        self.listening
    }

    pub fn rumble(&mut self, id: DeviceId, enable: bool) -> bool {
        self.input.rumble(id, enable)
    }

    /// Add a hotkey and resolve it against the current devices. A hotkey
    /// without an assignment takes the one the active profile stores under its
    /// name. Returns its index.
    pub fn add_hotkey(&mut self, mut hotkey: Hotkey) -> usize {
        if hotkey.mapping().assignment().is_empty() {
            if let Some(assignment) = self.profile.hotkey(hotkey.name()) {
                hotkey.mapping_mut().set_assignment_text(assignment);
            }
        }
        hotkey.mapping_mut().resolve(&self.devices);
        hotkey.sync();
        self.hotkeys.push(hotkey);
        self.hotkeys.len() - 1
    }

    /// Replace all assignments with those of `profile` and re-resolve.
    pub fn apply_profile(&mut self, profile: &BindingProfile) {
        self.listening = None;
        profile.apply(&mut self.pad, &mut self.hotkeys);
        self.profile = profile.clone();
        let bound = self.bind();
        info!(profile = %profile.name, bound, "binding profile applied");
    }

    /// Current assignments as a profile called `name`.
    pub fn profile(&self, name: impl Into<String>) -> BindingProfile {
        BindingProfile::capture(name, &self.pad, &self.hotkeys)
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut Input {
        &mut self.input
    }

    pub fn devices(&self) -> &[SharedDevice] {
        &self.devices
    }

    pub fn pad(&self) -> &VirtualPad {
        &self.pad
    }

    pub fn pad_mut(&mut self) -> &mut VirtualPad {
        &mut self.pad
    }

    pub fn hotkeys(&self) -> &[Hotkey] {
        &self.hotkeys
    }

    pub fn hotkey_mut(&mut self, index: usize) -> Option<&mut Hotkey> {
        self.hotkeys.get_mut(index)
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn set_poll_interval(&mut self, interval: Duration) {
        self.poll_interval = interval;
    }

    fn target_mut(&mut self, target: BindTarget) -> Option<&mut InputMapping> {
        match target {
            BindTarget::Pad(button) => Some(self.pad.get_mut(button)),
            BindTarget::Hotkey(index) => self.hotkeys.get_mut(index).map(Hotkey::mapping_mut),
        }
    }

    fn dispatch(&mut self, change: &Change) {
        if let Some(target) = self.listening {
            let action = self.target_mut(target).and_then(|mapping| {
                let action = mapping.bind_change(change);
                // A cancelled capture is not revived by the next re-resolve.
                if action == Some(BindAction::Cancel) {
                    mapping.reset_assignment();
                }
                action
            });
            // The capturing gesture never reaches the hotkeys, not even the
            // one just bound by it.
            if action.is_some() {
                self.listening = None;
                if let BindTarget::Hotkey(index) = target {
                    if let Some(hotkey) = self.hotkeys.get_mut(index) {
                        hotkey.rebase(change.new);
                    }
                }
                return;
            }
        }

        for hotkey in &mut self.hotkeys {
            hotkey.handle(change);
        }
    }
}

/// Whether the table differs in membership or in the records handed out.
fn churned(old: &[SharedDevice], new: &[SharedDevice]) -> bool {
    old.len() != new.len() || old.iter().zip(new).any(|(a, b)| !Arc::ptr_eq(a, b))
}

impl fmt::Debug for InputManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputManager")
            .field("input", &self.input)
            .field("devices", &self.devices.len())
            .field("pad", &self.pad)
            .field("hotkeys", &self.hotkeys)
            .field("listening", &self.listening)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_input::{DeviceTemplate, VirtualDriver, VirtualHub};
    use crate::backends::DriverRegistry;
    use crate::device::joypad;

    fn manager(hub: &VirtualHub) -> InputManager {
        let registry = DriverRegistry::new().with("Virtual", VirtualDriver::factory(hub.clone()));
        let config = InputConfig {
            poll_interval_ms: 0,
            ..InputConfig::default()
        };
        InputManager::new(Input::with_registry(registry), &config)
    }

    #[test]
    fn create_picks_optimal_and_snapshots() {
        let hub = VirtualHub::new();
        hub.plug(DeviceTemplate::joypad().buttons(4));
        let mut manager = manager(&hub);
        assert!(manager.create());
        assert_eq!(manager.input().driver(), "Virtual");
        assert_eq!(manager.devices().len(), 1);
    }

    #[test]
    fn poll_is_throttled() {
        let hub = VirtualHub::new();
        let mut manager = manager(&hub);
        manager.set_poll_interval(Duration::from_secs(3600));
        manager.create();
        assert!(!manager.poll());

        manager.set_poll_interval(Duration::ZERO);
        assert!(manager.poll());
    }

    #[test]
    fn listen_rejects_unknown_hotkey() {
        let hub = VirtualHub::new();
        let mut manager = manager(&hub);
        assert!(!manager.listen(BindTarget::Hotkey(0)));
        assert_eq!(manager.add_hotkey(Hotkey::new("Pause")), 0);
        assert!(manager.listen(BindTarget::Hotkey(0)));
        manager.cancel_listening();
        assert_eq!(manager.listening(), None);
    }

    #[test]
    fn listening_consumes_the_binding_gesture() {
        let hub = VirtualHub::new();
        let pad = hub.plug(DeviceTemplate::joypad().path("p1").buttons(4));
        let mut manager = manager(&hub);
        manager.create();

        assert!(manager.listen(BindTarget::Pad(PadButton::A)));
        hub.press(pad, joypad::BUTTON, 1);
        manager.poll();
        assert_eq!(manager.listening(), None);
        assert_eq!(
            manager.pad().a.assignment(),
            format!("Joypad/{pad}/Button/1")
        );

        hub.release(pad, joypad::BUTTON, 1);
        manager.poll();
        assert!(!manager.pad().poll().pressed(PadButton::A));
    }

    #[test]
    fn hotkeys_pick_up_profile_assignments() {
        let hub = VirtualHub::new();
        let id = hub.plug(DeviceTemplate::joypad().buttons(4));
        let registry = DriverRegistry::new().with("Virtual", VirtualDriver::factory(hub.clone()));
        let mut config = InputConfig::default();
        config
            .profile
            .hotkeys
            .insert("Pause".into(), format!("Joypad/{id}/Button/2"));
        let mut manager = InputManager::new(Input::with_registry(registry), &config);
        manager.create();

        let index = manager.add_hotkey(Hotkey::new("Pause"));
        assert!(manager.hotkeys()[index].mapping().is_bound());
    }

    #[test]
    fn churn_rebinds_from_assignment() {
        let hub = VirtualHub::new();
        let template = DeviceTemplate::joypad().path("port-2").buttons(4);
        let id = template.identity();
        let mut manager = manager(&hub);
        manager
            .pad_mut()
            .start
            .set_assignment_text(format!("Joypad/{id}/Button/3"));
        manager.create();
        assert!(!manager.pad().start.is_bound());

        hub.plug(template);
        manager.poll();
        assert!(manager.pad().start.is_bound());

        hub.unplug(id);
        manager.poll();
        assert!(!manager.pad().start.is_bound());
        assert_eq!(manager.pad().start.assignment(), format!("Joypad/{id}/Button/3"));
    }

    #[test]
    fn profile_exchange() {
        let hub = VirtualHub::new();
        let id = hub.plug(DeviceTemplate::joypad().buttons(2));
        let mut manager = manager(&hub);
        manager.create();

        let mut profile = BindingProfile::new("p");
        profile.pad.insert("B".into(), format!("Joypad/{id}/Button/0"));
        manager.apply_profile(&profile);
        assert!(manager.pad().b.is_bound());
        assert_eq!(manager.profile("p"), profile);
    }
}
