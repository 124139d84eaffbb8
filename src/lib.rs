//! # hidbind
//!
//! Cross-platform HID abstraction for interactive applications.
//!
//! - [`device`]: canonical device model (devices, groups, named inputs, 64-bit
//!   identity).
//! - [`driver`] / [`backends`]: the backend contract, the registry that picks a
//!   backend by name, and an in-memory backend.
//! - [`input::Input`]: façade owning the active backend and the single change
//!   sink.
//! - [`engine`]: change detection and analog normalization shared by backends.
//! - [`mapping`]: re-resolvable bindings from logical to physical controls.
//! - [`hotkey`]: edge-triggered hotkeys and a twelve-button virtual pad.
//! - [`manager::InputManager`]: ties all of the above into one poll loop.
//!
//! ```
//! use hidbind::backends::virtual_input::{DeviceTemplate, VirtualDriver, VirtualHub};
//! use hidbind::backends::DriverRegistry;
//! use hidbind::device::joypad;
//! use hidbind::{Input, InputConfig, InputManager, PadButton};
//!
//! let hub = VirtualHub::new();
//! let pad = hub.plug(DeviceTemplate::joypad().path("usb-3").buttons(4));
//!
//! let registry = DriverRegistry::new().with("Virtual", VirtualDriver::factory(hub.clone()));
//! let config = InputConfig { poll_interval_ms: 0, ..InputConfig::default() };
//! let mut manager = InputManager::new(Input::with_registry(registry), &config);
//! manager.pad_mut().start.set_assignment_text(format!("Joypad/{pad}/Button/3"));
//! manager.create();
//!
//! hub.press(pad, joypad::BUTTON, 3);
//! manager.poll();
//! assert!(manager.pad().poll().pressed(PadButton::Start));
//! ```

pub mod backends;
pub mod binding;
pub mod config;
pub mod device;
pub mod driver;
pub mod engine;
pub mod error;
pub mod event;
pub mod hotkey;
pub mod input;
pub mod manager;
pub mod mapping;
pub mod metadata;

pub use binding::BindingProfile;
pub use config::InputConfig;
pub use device::{Device, DeviceId, DeviceKind, Group, SharedDevice};
pub use driver::{Context, InputDriver, NullDriver};
pub use error::{Error, Result};
pub use event::{Change, Notifier};
pub use hotkey::{Hotkey, PadButton, PadState, VirtualPad};
pub use input::Input;
pub use manager::{BindTarget, InputManager};
pub use mapping::{Assignment, InputMapping, Qualifier};
