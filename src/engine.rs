//! Change detection.
//!
//! Backends never write input values directly. For every raw sample they call
//! [`assign`] with the device record they keep across polls; `assign` compares
//! the sample against the stored value and, when it differs, notifies the sink
//! **before** committing. A listener therefore always sees `(old, new)` with
//! `old` equal to what the device reported up to that moment.
//!
//! Analog samples go through [`normalize`] first so that every backend produces
//! bit-identical values for the same physical deflection.

use crate::device::SharedDevice;
use crate::event::{Change, Notifier};
use std::sync::Arc;
use tracing::trace;

/// Canonical scaling of a bounded raw range onto `i16`:
/// `(raw - min) * 65535 / (max - min) - 32767`, saturated.
///
/// `min` maps to `-32767` and `max` to `+32767` (the formula yields `32768`,
/// which saturates). A degenerate range (`max <= min`) reads as centred.
pub fn normalize(raw: i32, min: i32, max: i32) -> i16 {
    let range = i64::from(max) - i64::from(min);
    if range <= 0 {
        return 0;
    }
    saturate((i64::from(raw) - i64::from(min)) * 65535 / range - 32767)
}

/// Clamp into the `i16` range without wrapping.
pub fn saturate(value: i64) -> i16 {
    value.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16
}

/// Coerce a digital sample to exactly `0` or `1`.
pub fn digital(raw: i32) -> i16 {
    i16::from(raw != 0)
}

/// How a backend interprets raw samples of one control.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Digital,
    Analog { min: i32, max: i32 },
    /// Raw value is already canonical (e.g. relative mouse motion); saturated only.
    Raw,
}

impl Channel {
    pub fn apply(self, raw: i32) -> i16 {
        match self {
            Channel::Digital => digital(raw),
            Channel::Analog { min, max } => normalize(raw, min, max),
            Channel::Raw => saturate(i64::from(raw)),
        }
    }
}

/// Commit `value` to `device[group][input]`, notifying first if it changed.
///
/// Returns whether a notification was emitted. Unknown indices are ignored.
pub fn assign(
    notifier: &mut Notifier,
    device: &SharedDevice,
    group: usize,
    input: usize,
    value: i16,
) -> bool {
    let Some(stored) = device.input(group, input) else {
        trace!(device = device.name(), group, input, "sample for unknown input dropped");
        return false;
    };

    let old = stored.value();
    if old == value {
        return false;
    }

    trace!(
        device = device.name(),
        id = %device.id(),
        group,
        input,
        old,
        new = value,
        "input changed"
    );
    notifier.notify(&Change {
        device: Arc::clone(device),
        group,
        input,
        old,
        new: value,
    });
    stored.set_value(value);
    true
}

/// Set a starting value without notifying, e.g. the state read while
/// enumerating a freshly plugged device.
pub fn seed(device: &SharedDevice, group: usize, input: usize, value: i16) {
    if let Some(stored) = device.input(group, input) {
        stored.set_value(value);
    }
}
