//! Canonical device model.
//!
//! Every backend describes what it sees as a [`Device`]: an ordered list of
//! [`Group`]s ("Axis", "Hat", "Trigger", "Button", ...), each an ordered list of
//! named [`Input`]s holding a signed 16-bit value.
//!
//! ## Addressing
//! Group and input **indices** are assigned when the device is built and never
//! change afterwards. Bindings store names in their assignment string but cache
//! the indices once resolved.
//!
//! ## Sharing
//! Devices are handed out as [`SharedDevice`] (`Arc<Device>`). The tree shape is
//! frozen once the device is shared; only input values change, and only the
//! change-detection engine writes them (see [`crate::engine`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI16, Ordering};
use std::sync::Arc;

/// Shared handle to a device. Held by the backend's device table and by any
/// binding currently resolved to it.
pub type SharedDevice = Arc<Device>;

/// Group indices of a [`DeviceKind::Keyboard`].
pub mod keyboard {
    pub const BUTTON: usize = 0;
}

/// Group indices of a [`DeviceKind::Mouse`].
pub mod mouse {
    pub const AXIS: usize = 0;
    pub const BUTTON: usize = 1;
}

/// Group indices of a [`DeviceKind::Joypad`].
pub mod joypad {
    pub const AXIS: usize = 0;
    pub const HAT: usize = 1;
    pub const TRIGGER: usize = 2;
    pub const BUTTON: usize = 3;
}

/// 64-bit device identity: `path_id` (bits 32..64), `vendor_id` (bits 16..32)
/// and `product_id` (bits 0..16).
///
/// The setters repack the whole word so that changing one field never disturbs
/// the other two.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(u64);

impl DeviceId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn from_parts(path_id: u32, vendor_id: u16, product_id: u16) -> Self {
        Self((path_id as u64) << 32 | (vendor_id as u64) << 16 | product_id as u64)
    }

    /// Parse the hexadecimal form used in assignment strings.
    pub fn from_hex(text: &str) -> Option<Self> {
        u64::from_str_radix(text, 16).ok().map(Self)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn path_id(self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn vendor_id(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn product_id(self) -> u16 {
        self.0 as u16
    }

    pub fn set_path_id(&mut self, path_id: u32) {
        *self = Self::from_parts(path_id, self.vendor_id(), self.product_id());
    }

    pub fn set_vendor_id(&mut self, vendor_id: u16) {
        *self = Self::from_parts(self.path_id(), vendor_id, self.product_id());
    }

    pub fn set_product_id(&mut self, product_id: u16) {
        *self = Self::from_parts(self.path_id(), self.vendor_id(), product_id);
    }
}

/// Lowercase, zero-padded to 16 digits (the assignment string form).
impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A single physical control.
#[derive(Debug)]
pub struct Input {
    name: String,
    value: AtomicI16,
}

impl Input {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AtomicI16::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last value committed by the change-detection engine.
    pub fn value(&self) -> i16 {
        self.value.load(Ordering::Acquire)
    }

    pub(crate) fn set_value(&self, value: i16) {
        self.value.store(value, Ordering::Release);
    }
}

/// Ordered, named bundle of same-role inputs.
#[derive(Debug)]
pub struct Group {
    name: String,
    inputs: Vec<Input>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn append(&mut self, name: impl Into<String>) {
        self.inputs.push(Input::new(name));
    }

    pub fn append_list(&mut self, names: &[&str]) {
        for name in names {
            self.append(*name);
        }
    }

    /// Position of the input called `name`, if any.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|input| input.name == name)
    }

    pub fn input(&self, index: usize) -> Option<&Input> {
        self.inputs.get(index)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Input> {
        self.inputs.iter()
    }
}

/// Closed set of device variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    /// "No device". Receiving it while listening cancels a capture.
    Null,
    Keyboard,
    Mouse,
    Joypad {
        /// Whether on/off rumble is supported.
        rumble: bool,
    },
}

/// A physical device as seen through one backend.
#[derive(Debug)]
pub struct Device {
    name: String,
    id: DeviceId,
    kind: DeviceKind,
    groups: Vec<Group>,
}

impl Device {
    fn with_groups(name: &str, kind: DeviceKind, product_id: u16, groups: &[&str]) -> Self {
        let mut device = Self {
            name: name.to_string(),
            id: DeviceId::from_parts(0, 0x0000, product_id),
            kind,
            groups: Vec::new(),
        };
        device.append_list(groups);
        device
    }

    pub fn null() -> Self {
        Self::with_groups("Null", DeviceKind::Null, 0x0000, &["Null"])
    }

    pub fn keyboard() -> Self {
        Self::with_groups("Keyboard", DeviceKind::Keyboard, 0x0001, &["Button"])
    }

    pub fn mouse() -> Self {
        Self::with_groups("Mouse", DeviceKind::Mouse, 0x0002, &["Axis", "Button"])
    }

    pub fn joypad() -> Self {
        Self::with_groups(
            "Joypad",
            DeviceKind::Joypad { rumble: false },
            0x0003,
            &["Axis", "Hat", "Trigger", "Button"],
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn set_id(&mut self, id: DeviceId) {
        self.id = id;
    }

    pub fn set_path_id(&mut self, path_id: u32) {
        self.id.set_path_id(path_id);
    }

    pub fn set_vendor_id(&mut self, vendor_id: u16) {
        self.id.set_vendor_id(vendor_id);
    }

    pub fn set_product_id(&mut self, product_id: u16) {
        self.id.set_product_id(product_id);
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, DeviceKind::Null)
    }

    pub fn is_keyboard(&self) -> bool {
        matches!(self.kind, DeviceKind::Keyboard)
    }

    pub fn is_mouse(&self) -> bool {
        matches!(self.kind, DeviceKind::Mouse)
    }

    pub fn is_joypad(&self) -> bool {
        matches!(self.kind, DeviceKind::Joypad { .. })
    }

    /// Rumble capability. Always `false` for non-joypads.
    pub fn rumble(&self) -> bool {
        matches!(self.kind, DeviceKind::Joypad { rumble: true })
    }

    /// Has no effect on non-joypads.
    pub fn set_rumble(&mut self, rumble: bool) {
        if let DeviceKind::Joypad { rumble: flag } = &mut self.kind {
            *flag = rumble;
        }
    }

    pub fn append(&mut self, name: impl Into<String>) {
        self.groups.push(Group::new(name));
    }

    pub fn append_list(&mut self, names: &[&str]) {
        for name in names {
            self.append(*name);
        }
    }

    /// Position of the group called `name`, if any.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|group| group.name == name)
    }

    pub fn group(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    pub fn group_mut(&mut self, index: usize) -> Option<&mut Group> {
        self.groups.get_mut(index)
    }

    /// Shortcut for `group(group)?.input(input)`.
    pub fn input(&self, group: usize, input: usize) -> Option<&Input> {
        self.group(group)?.input(input)
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn into_shared(self) -> SharedDevice {
        Arc::new(self)
    }
}
