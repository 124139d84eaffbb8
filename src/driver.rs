//! Backend contract.
//!
//! [`InputDriver`] is what every backend implements. All methods have defaults
//! that describe the inert `None` backend, so a backend only overrides what it
//! actually supports and [`NullDriver`] is just the trait with nothing
//! overridden.

use crate::device::{DeviceId, SharedDevice};
use crate::event::Notifier;

/// Name reported by the inert backend.
pub const NONE: &str = "None";

/// Opaque host window/display handle a backend may bind to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Context(pub usize);

impl Context {
    pub const NONE: Context = Context(0);
}

/// A source of devices and change notifications.
pub trait InputDriver: Send {
    /// Registered name of this backend (`"udev"`, `"Windows"`, ...).
    fn name(&self) -> &str {
        NONE
    }

    /// Allocate OS resources. Returns `false` on failure; never panics.
    fn create(&mut self) -> bool {
        true
    }

    fn ready(&self) -> bool {
        true
    }

    /// Whether this backend needs a host [`Context`].
    fn has_context(&self) -> bool {
        false
    }

    /// Bind to a host context. Backends without the notion accept anything.
    fn set_context(&mut self, _context: Context) -> bool {
        true
    }

    /// Exclusive pointer capture.
    fn acquired(&self) -> bool {
        false
    }

    fn acquire(&mut self) -> bool {
        false
    }

    fn release(&mut self) -> bool {
        false
    }

    /// Sample every device and return a full snapshot.
    ///
    /// Changes found while sampling are reported through `notifier` before the
    /// new value is committed. Devices that did not change are still returned.
    fn poll(&mut self, _notifier: &mut Notifier) -> Vec<SharedDevice> {
        Vec::new()
    }

    /// Turn rumble on or off. `false` if the device is unknown or cannot rumble.
    fn rumble(&mut self, _id: DeviceId, _enable: bool) -> bool {
        false
    }
}

/// The always-available inert backend.
#[derive(Debug, Default)]
pub struct NullDriver;

impl InputDriver for NullDriver {}
