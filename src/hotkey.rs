//! Hotkeys and the twelve-button virtual pad.
//!
//! Both are thin layers over [`InputMapping`]: a [`Hotkey`] adds edge callbacks,
//! a [`VirtualPad`] groups the mappings a classic controller needs and reads
//! them all at once.

use crate::device::SharedDevice;
use crate::event::Change;
use crate::mapping::InputMapping;
use std::fmt;
use tracing::trace;

/// Edge callback.
pub type Callback = Box<dyn FnMut() + Send>;

/// A mapping that fires on logical press and release.
///
/// The hotkey remembers the last logical value (0 or 1, after the qualifier).
/// Callbacks only fire when that value flips, so repeated samples on the same
/// side of the threshold are ignored.
pub struct Hotkey {
    mapping: InputMapping,
    state: i16,
    on_press: Option<Callback>,
    on_release: Option<Callback>,
}

impl Hotkey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            mapping: InputMapping::new(name),
            state: 0,
            on_press: None,
            on_release: None,
        }
    }

    pub fn on_press(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_press = Some(Box::new(callback));
        self
    }

    pub fn on_release(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_release = Some(Box::new(callback));
        self
    }

    pub fn name(&self) -> &str {
        self.mapping.name()
    }

    pub fn mapping(&self) -> &InputMapping {
        &self.mapping
    }

    pub fn mapping_mut(&mut self) -> &mut InputMapping {
        &mut self.mapping
    }

    pub fn is_pressed(&self) -> bool {
        self.state != 0
    }

    /// Offer a change notification. Returns whether it concerned this hotkey's
    /// control.
    pub fn handle(&mut self, change: &Change) -> bool {
        if !self.mapping.matches(change) {
            return false;
        }
        self.feed(change.new);
        true
    }

    /// Feed a raw value of the bound control.
    pub fn feed(&mut self, raw: i16) {
        let logical = self.mapping.logical(raw);
        self.transition(logical);
    }

    /// Re-read the live value, e.g. after the mapping was re-resolved. A
    /// hotkey left unbound while held fires its release here.
    pub fn sync(&mut self) {
        let logical = i16::from(self.mapping.value() != 0);
        self.transition(logical);
    }

    /// Settle the edge state after the mapping was captured or cancelled.
    ///
    /// A held hotkey fires its release; the state then takes `raw` (the value
    /// of the newly bound control, ignored when unbound) without firing a
    /// press.
    pub fn rebase(&mut self, raw: i16) {
        if self.state != 0 {
            self.transition(0);
        }
        self.state = if self.mapping.is_bound() {
            self.mapping.logical(raw)
        } else {
            0
        };
    }

    fn transition(&mut self, logical: i16) {
        if logical == self.state {
            return;
        }
        self.state = logical;
        trace!(hotkey = self.mapping.name(), pressed = logical != 0, "hotkey edge");

        let callback = if logical != 0 {
            self.on_press.as_mut()
        } else {
            self.on_release.as_mut()
        };
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl fmt::Debug for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hotkey")
            .field("name", &self.mapping.name())
            .field("assignment", &self.mapping.assignment())
            .field("state", &self.state)
            .finish()
    }
}

/// Logical buttons of a [`VirtualPad`], in fixed order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PadButton {
    Up,
    Down,
    Left,
    Right,
    Select,
    Start,
    A,
    B,
    X,
    Y,
    L,
    R,
}

impl PadButton {
    pub const ALL: [PadButton; 12] = [
        PadButton::Up,
        PadButton::Down,
        PadButton::Left,
        PadButton::Right,
        PadButton::Select,
        PadButton::Start,
        PadButton::A,
        PadButton::B,
        PadButton::X,
        PadButton::Y,
        PadButton::L,
        PadButton::R,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PadButton::Up => "Up",
            PadButton::Down => "Down",
            PadButton::Left => "Left",
            PadButton::Right => "Right",
            PadButton::Select => "Select",
            PadButton::Start => "Start",
            PadButton::A => "A",
            PadButton::B => "B",
            PadButton::X => "X",
            PadButton::Y => "Y",
            PadButton::L => "L",
            PadButton::R => "R",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|button| button.name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PadButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Twelve mappings forming a classic controller.
#[derive(Clone, Debug)]
pub struct VirtualPad {
    pub up: InputMapping,
    pub down: InputMapping,
    pub left: InputMapping,
    pub right: InputMapping,
    pub select: InputMapping,
    pub start: InputMapping,
    pub a: InputMapping,
    pub b: InputMapping,
    pub x: InputMapping,
    pub y: InputMapping,
    pub l: InputMapping,
    pub r: InputMapping,
}

impl VirtualPad {
    pub fn new() -> Self {
        Self {
            up: InputMapping::new("Up"),
            down: InputMapping::new("Down"),
            left: InputMapping::new("Left"),
            right: InputMapping::new("Right"),
            select: InputMapping::new("Select"),
            start: InputMapping::new("Start"),
            a: InputMapping::new("A"),
            b: InputMapping::new("B"),
            x: InputMapping::new("X"),
            y: InputMapping::new("Y"),
            l: InputMapping::new("L"),
            r: InputMapping::new("R"),
        }
    }

    pub fn get(&self, button: PadButton) -> &InputMapping {
        self.mappings()[button.index()]
    }

    pub fn get_mut(&mut self, button: PadButton) -> &mut InputMapping {
        match button {
            PadButton::Up => &mut self.up,
            PadButton::Down => &mut self.down,
            PadButton::Left => &mut self.left,
            PadButton::Right => &mut self.right,
            PadButton::Select => &mut self.select,
            PadButton::Start => &mut self.start,
            PadButton::A => &mut self.a,
            PadButton::B => &mut self.b,
            PadButton::X => &mut self.x,
            PadButton::Y => &mut self.y,
            PadButton::L => &mut self.l,
            PadButton::R => &mut self.r,
        }
    }

    /// All mappings in [`PadButton::ALL`] order.
    pub fn mappings(&self) -> [&InputMapping; 12] {
        [
            &self.up,
            &self.down,
            &self.left,
            &self.right,
            &self.select,
            &self.start,
            &self.a,
            &self.b,
            &self.x,
            &self.y,
            &self.l,
            &self.r,
        ]
    }

    pub fn mappings_mut(&mut self) -> [&mut InputMapping; 12] {
        let Self {
            up,
            down,
            left,
            right,
            select,
            start,
            a,
            b,
            x,
            y,
            l,
            r,
        } = self;
        [up, down, left, right, select, start, a, b, x, y, l, r]
    }

    /// Resolve every mapping against `devices`. Returns how many are bound.
    pub fn bind(&mut self, devices: &[SharedDevice]) -> usize {
        self.mappings_mut()
            .into_iter()
            .map(|mapping| mapping.resolve(devices))
            .filter(|bound| *bound)
            .count()
    }

    /// Snapshot of all twelve logical values.
    pub fn poll(&self) -> PadState {
        let mut values = [0; 12];
        for (value, mapping) in values.iter_mut().zip(self.mappings()) {
            *value = mapping.value();
        }
        PadState { values }
    }
}

impl Default for VirtualPad {
    fn default() -> Self {
        Self::new()
    }
}

/// Values read by [`VirtualPad::poll`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PadState {
    values: [i16; 12],
}

impl PadState {
    pub fn get(&self, button: PadButton) -> i16 {
        self.values[button.index()]
    }

    pub fn pressed(&self, button: PadButton) -> bool {
        self.get(button) != 0
    }

    pub fn values(&self) -> &[i16; 12] {
        &self.values
    }
}
