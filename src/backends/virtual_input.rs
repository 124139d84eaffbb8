//! In-memory backend.
//!
//! [`VirtualHub`] plays the part the OS plays for a real backend: it is a shared,
//! mutex-guarded world of plugged devices that anything (a test, a scripting
//! layer, a network bridge) can plug, unplug and drive. [`VirtualDriver`] is an
//! [`InputDriver`] attached to a hub; it keeps its own persistent device records
//! and turns queued hub events into change notifications on every poll.
//!
//! ```
//! use hidbind::backends::virtual_input::{DeviceTemplate, VirtualDriver, VirtualHub};
//! use hidbind::device::joypad;
//! use hidbind::Input;
//!
//! let hub = VirtualHub::new();
//! let pad = hub.plug(DeviceTemplate::joypad().path("usb-1").buttons(4));
//!
//! let mut input = Input::new();
//! input.install(Box::new(VirtualDriver::new(hub.clone())));
//!
//! hub.press(pad, joypad::BUTTON, 2);
//! let devices = input.poll();
//! assert_eq!(devices[0].input(joypad::BUTTON, 2).unwrap().value(), 1);
//! ```
//!
//! Samples are queued, not just latched: a press and release between two polls
//! produce two notifications, in order.

use crate::device::{Device, DeviceId, DeviceKind, SharedDevice};
use crate::driver::InputDriver;
use crate::engine::{self, Channel};
use crate::event::Notifier;
use crate::metadata::DeviceMeta;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Registered backend name.
pub const NAME: &str = "Virtual";

/// Shape and identity of a device to plug into a [`VirtualHub`].
#[derive(Clone, Debug)]
pub struct DeviceTemplate {
    kind: DeviceKind,
    meta: DeviceMeta,
    groups: Vec<(String, Vec<(String, Channel)>)>,
}

impl DeviceTemplate {
    fn from_prototype(prototype: Device) -> Self {
        let id = prototype.id();
        Self {
            kind: prototype.kind(),
            meta: DeviceMeta::new("", id.vendor_id(), id.product_id()),
            groups: prototype
                .groups()
                .iter()
                .map(|group| (group.name().to_string(), Vec::new()))
                .collect(),
        }
    }

    /// Keyboard with one digital `Button` per key name.
    pub fn keyboard<I>(keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut template = Self::from_prototype(Device::keyboard());
        for key in keys {
            template.push("Button", key.into(), Channel::Digital);
        }
        template
    }

    /// Mouse with relative axes and digital buttons, numbered from 0.
    pub fn mouse(axes: usize, buttons: usize) -> Self {
        Self::from_prototype(Device::mouse())
            .numbered("Axis", axes, Channel::Raw)
            .numbered("Button", buttons, Channel::Digital)
    }

    /// Joypad with no controls yet; add them with the builder methods.
    pub fn joypad() -> Self {
        Self::from_prototype(Device::joypad())
    }

    pub fn axes(self, count: usize, min: i32, max: i32) -> Self {
        self.numbered("Axis", count, Channel::Analog { min, max })
    }

    pub fn hats(self, count: usize, min: i32, max: i32) -> Self {
        self.numbered("Hat", count, Channel::Analog { min, max })
    }

    pub fn triggers(self, count: usize, min: i32, max: i32) -> Self {
        self.numbered("Trigger", count, Channel::Analog { min, max })
    }

    pub fn buttons(self, count: usize) -> Self {
        self.numbered("Button", count, Channel::Digital)
    }

    pub fn rumble(mut self, rumble: bool) -> Self {
        if let DeviceKind::Joypad { rumble: flag } = &mut self.kind {
            *flag = rumble;
        }
        self
    }

    /// Topology path hashed into the identity.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.meta.path = path.into();
        self
    }

    pub fn vendor(mut self, vid: u16) -> Self {
        self.meta.vid = vid;
        self
    }

    pub fn product(mut self, pid: u16) -> Self {
        self.meta.pid = pid;
        self
    }

    pub fn identity(&self) -> DeviceId {
        self.meta.identity()
    }

    pub fn meta(&self) -> &DeviceMeta {
        &self.meta
    }

    fn numbered(mut self, group: &str, count: usize, channel: Channel) -> Self {
        let start = self
            .groups
            .iter()
            .find(|(name, _)| name == group)
            .map_or(0, |(_, inputs)| inputs.len());
        for n in start..start + count {
            self.push(group, n.to_string(), channel);
        }
        self
    }

    fn push(&mut self, group: &str, input: String, channel: Channel) {
        match self.groups.iter_mut().find(|(name, _)| name == group) {
            Some((_, inputs)) => inputs.push((input, channel)),
            None => warn!(group, input, "device template has no such group"),
        }
    }

    fn channels(&self) -> Vec<Vec<Channel>> {
        self.groups
            .iter()
            .map(|(_, inputs)| inputs.iter().map(|(_, channel)| *channel).collect())
            .collect()
    }

    fn build(&self) -> Device {
        let mut device = match self.kind {
            DeviceKind::Null => Device::null(),
            DeviceKind::Keyboard => Device::keyboard(),
            DeviceKind::Mouse => Device::mouse(),
            DeviceKind::Joypad { rumble } => {
                let mut pad = Device::joypad();
                pad.set_rumble(rumble);
                pad
            }
        };
        device.set_id(self.identity());
        for (index, (_, inputs)) in self.groups.iter().enumerate() {
            if let Some(group) = device.group_mut(index) {
                for (name, _) in inputs {
                    group.append(name.clone());
                }
            }
        }
        device
    }
}

#[derive(Debug)]
enum HubEvent {
    Plug(DeviceId),
    Unplug(DeviceId),
    Sample {
        id: DeviceId,
        group: usize,
        input: usize,
        raw: i32,
    },
}

/// A hub event taken off the queue, carrying what applying it needs so the
/// hub is no longer locked by then.
#[derive(Debug)]
enum Pending {
    Attach(DeviceTemplate),
    Detach(DeviceId),
    Sample {
        id: DeviceId,
        group: usize,
        input: usize,
        raw: i32,
    },
}

#[derive(Debug)]
struct Plugged {
    id: DeviceId,
    template: DeviceTemplate,
    raw: Vec<Vec<i32>>,
    rumbling: bool,
}

#[derive(Debug, Default)]
struct HubState {
    plugged: Vec<Plugged>,
    pending: VecDeque<HubEvent>,
}

impl HubState {
    fn find(&self, id: DeviceId) -> Option<&Plugged> {
        self.plugged.iter().find(|p| p.id == id)
    }

    fn find_mut(&mut self, id: DeviceId) -> Option<&mut Plugged> {
        self.plugged.iter_mut().find(|p| p.id == id)
    }
}

/// Shared world of virtual devices. Cloning yields another handle to the
/// same world.
#[derive(Clone, Debug, Default)]
pub struct VirtualHub {
    state: Arc<Mutex<HubState>>,
}

impl VirtualHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Plug a device in. All raw values start at 0.
    ///
    /// Plugging a second device with an identity already present is allowed
    /// (that is what a hash collision looks like); lookups by id then reach the
    /// first one.
    pub fn plug(&self, template: DeviceTemplate) -> DeviceId {
        let id = template.identity();
        let raw = template
            .groups
            .iter()
            .map(|(_, inputs)| vec![0; inputs.len()])
            .collect();

        let mut state = self.lock();
        if state.find(id).is_some() {
            warn!(%id, "plugged device collides with an existing identity");
        }
        state.plugged.push(Plugged {
            id,
            template,
            raw,
            rumbling: false,
        });
        state.pending.push_back(HubEvent::Plug(id));
        id
    }

    /// Unplug the first device with identity `id`.
    pub fn unplug(&self, id: DeviceId) -> bool {
        let mut state = self.lock();
        let Some(position) = state.plugged.iter().position(|p| p.id == id) else {
            return false;
        };
        state.plugged.remove(position);
        state.pending.push_back(HubEvent::Unplug(id));
        true
    }

    /// Report a raw sample for `device[group][input]`.
    pub fn set(&self, id: DeviceId, group: usize, input: usize, raw: i32) -> bool {
        let mut state = self.lock();
        let Some(slot) = state
            .find_mut(id)
            .and_then(|p| p.raw.get_mut(group))
            .and_then(|g| g.get_mut(input))
        else {
            return false;
        };
        *slot = raw;
        state.pending.push_back(HubEvent::Sample {
            id,
            group,
            input,
            raw,
        });
        true
    }

    pub fn press(&self, id: DeviceId, group: usize, input: usize) -> bool {
        self.set(id, group, input, 1)
    }

    pub fn release(&self, id: DeviceId, group: usize, input: usize) -> bool {
        self.set(id, group, input, 0)
    }

    /// Identities of everything currently plugged, in plug order.
    pub fn plugged(&self) -> Vec<DeviceId> {
        self.lock().plugged.iter().map(|p| p.id).collect()
    }

    /// Whether a driver has switched rumble on for `id`.
    pub fn is_rumbling(&self, id: DeviceId) -> bool {
        self.lock().find(id).is_some_and(|p| p.rumbling)
    }
}

/// A device as the driver tracks it across polls.
struct Record {
    device: SharedDevice,
    channels: Vec<Vec<Channel>>,
}

impl Record {
    fn new(template: &DeviceTemplate) -> Self {
        Self {
            device: template.build().into_shared(),
            channels: template.channels(),
        }
    }

    fn channel(&self, group: usize, input: usize) -> Option<Channel> {
        self.channels.get(group)?.get(input).copied()
    }
}

/// [`InputDriver`] reading from a [`VirtualHub`].
pub struct VirtualDriver {
    hub: VirtualHub,
    records: Vec<Record>,
    ready: bool,
    acquired: bool,
}

impl VirtualDriver {
    pub fn new(hub: VirtualHub) -> Self {
        Self {
            hub,
            records: Vec::new(),
            ready: false,
            acquired: false,
        }
    }

    /// Factory suitable for [`DriverRegistry::register`](crate::backends::DriverRegistry::register).
    pub fn factory(hub: VirtualHub) -> impl Fn() -> Box<dyn InputDriver> + Send + Sync + 'static {
        move || -> Box<dyn InputDriver> { Box::new(VirtualDriver::new(hub.clone())) }
    }

    fn record(&self, id: DeviceId) -> Option<&Record> {
        self.records.iter().find(|r| r.device.id() == id)
    }

    /// Take every queued event under one lock.
    fn drain(&self) -> Vec<Pending> {
        let mut state = self.hub.lock();
        let events: Vec<HubEvent> = state.pending.drain(..).collect();
        events
            .into_iter()
            .filter_map(|event| match event {
                // Already gone again before we got to see it.
                HubEvent::Plug(id) => state
                    .find(id)
                    .map(|plugged| Pending::Attach(plugged.template.clone())),
                HubEvent::Unplug(id) => Some(Pending::Detach(id)),
                HubEvent::Sample {
                    id,
                    group,
                    input,
                    raw,
                } => Some(Pending::Sample {
                    id,
                    group,
                    input,
                    raw,
                }),
            })
            .collect()
    }

    fn apply(&mut self, event: Pending, notifier: &mut Notifier) {
        match event {
            Pending::Attach(template) => {
                let record = Record::new(&template);
                for (group, channels) in record.channels.iter().enumerate() {
                    for (input, channel) in channels.iter().enumerate() {
                        engine::seed(&record.device, group, input, channel.apply(0));
                    }
                }
                debug!(device = record.device.name(), id = %record.device.id(), "virtual device attached");
                self.records.push(record);
            }
            Pending::Detach(id) => {
                if let Some(position) = self.records.iter().position(|r| r.device.id() == id) {
                    let record = self.records.remove(position);
                    debug!(device = record.device.name(), %id, "virtual device detached");
                }
            }
            Pending::Sample {
                id,
                group,
                input,
                raw,
            } => {
                let Some(record) = self.record(id) else {
                    return;
                };
                let Some(channel) = record.channel(group, input) else {
                    return;
                };
                engine::assign(notifier, &record.device, group, input, channel.apply(raw));
            }
        }
    }
}

impl InputDriver for VirtualDriver {
    fn name(&self) -> &str {
        NAME
    }

    /// Enumerate what is plugged right now. Values are seeded from the hub's
    /// current raw state without notifications.
    fn create(&mut self) -> bool {
        let hub = self.hub.clone();
        let mut state = hub.lock();
        state.pending.clear();

        self.records = state
            .plugged
            .iter()
            .map(|plugged| {
                let record = Record::new(&plugged.template);
                for (group, channels) in record.channels.iter().enumerate() {
                    for (input, channel) in channels.iter().enumerate() {
                        let raw = plugged.raw[group][input];
                        engine::seed(&record.device, group, input, channel.apply(raw));
                    }
                }
                record
            })
            .collect();
        debug!(devices = self.records.len(), "virtual driver enumerated");
        self.ready = true;
        true
    }

    fn ready(&self) -> bool {
        self.ready
    }

    fn acquired(&self) -> bool {
        self.acquired
    }

    fn acquire(&mut self) -> bool {
        if !self.ready || !self.records.iter().any(|r| r.device.is_mouse()) {
            return false;
        }
        self.acquired = true;
        true
    }

    fn release(&mut self) -> bool {
        if !self.acquired {
            return false;
        }
        self.acquired = false;
        true
    }

    /// Apply queued hub events in order, then return every live device.
    ///
    /// The queue is taken in one lock, so a poll sees a consistent point in
    /// time. The lock is released before any notification, so the sink may
    /// use the hub.
    fn poll(&mut self, notifier: &mut Notifier) -> Vec<SharedDevice> {
        if !self.ready {
            return Vec::new();
        }

        for event in self.drain() {
            self.apply(event, notifier);
        }

        self.records.iter().map(|r| Arc::clone(&r.device)).collect()
    }

    fn rumble(&mut self, id: DeviceId, enable: bool) -> bool {
        match self.record(id) {
            Some(record) if record.device.rumble() => {}
            _ => return false,
        }
        // Unplugged since the last poll.
        let mut state = self.hub.lock();
        let Some(plugged) = state.find_mut(id) else {
            return false;
        };
        plugged.rumbling = enable;
        true
    }
}
