//! Backend-agnostic façade.
//!
//! [`Input`] owns exactly one [`InputDriver`] and the single change sink. It is a
//! plain value: construct it, hand it to whatever needs it, drop it when done.
//!
//! # Driver switches
//! [`Input::create`] replaces the driver. Devices returned by an earlier
//! [`Input::poll`] belong to the old driver and are never updated again; callers
//! must re-resolve by [`DeviceId`] (which is what
//! [`InputMapping::resolve`](crate::mapping::InputMapping::resolve) does).

use crate::backends::DriverRegistry;
use crate::device::{DeviceId, SharedDevice};
use crate::driver::{Context, InputDriver, NullDriver, NONE};
use crate::event::{Change, Notifier};
use std::fmt;
use tracing::{debug, info, warn};

pub struct Input {
    registry: DriverRegistry,
    driver: Box<dyn InputDriver>,
    context: Context,
    notifier: Notifier,
}

impl Input {
    /// Façade with an empty registry: only `"None"` is available until a
    /// driver is [`install`](Self::install)ed.
    pub fn new() -> Self {
        Self::with_registry(DriverRegistry::new())
    }

    pub fn with_registry(registry: DriverRegistry) -> Self {
        Self {
            registry,
            driver: Box::new(NullDriver),
            context: Context::NONE,
            notifier: Notifier::new(),
        }
    }

    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DriverRegistry {
        &mut self.registry
    }

    /// Names of every selectable backend, `"None"` last.
    pub fn has_drivers(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn has_driver(&self, name: &str) -> bool {
        self.registry.has(name)
    }

    pub fn optimal_driver(&self) -> String {
        self.registry.optimal()
    }

    pub fn safest_driver(&self) -> String {
        self.registry.safest()
    }

    /// Back to the inert driver with no context.
    pub fn reset(&mut self) {
        self.driver = Box::new(NullDriver);
        self.context = Context::NONE;
    }

    /// Select a backend by name (empty = optimal) and initialize it.
    ///
    /// An unknown name leaves the `"None"` driver in place. Returns the
    /// backend's own `create()` result.
    pub fn create(&mut self, name: &str) -> bool {
        self.reset();

        let name = if name.is_empty() {
            self.registry.optimal()
        } else {
            name.to_string()
        };

        match self.registry.build(&name) {
            Some(driver) => self.driver = driver,
            None => warn!(driver = %name, "unknown input driver, falling back to None"),
        }

        let created = self.driver.create();
        info!(driver = self.driver.name(), created, "input driver selected");
        created
    }

    /// Replace the driver with a pre-built instance and initialize it.
    pub fn install(&mut self, driver: Box<dyn InputDriver>) -> bool {
        self.reset();
        self.driver = driver;
        let created = self.driver.create();
        info!(driver = self.driver.name(), created, "input driver installed");
        created
    }

    /// Name of the active backend.
    pub fn driver(&self) -> &str {
        self.driver.name()
    }

    /// `false` while the inert driver is active.
    pub fn is_active(&self) -> bool {
        self.driver.name() != NONE
    }

    pub fn ready(&self) -> bool {
        self.driver.ready()
    }

    pub fn has_context(&self) -> bool {
        self.driver.has_context()
    }

    pub fn context(&self) -> Context {
        self.context
    }

    /// Bind the driver to a host context. The cached value only changes if the
    /// driver accepted the new one.
    pub fn set_context(&mut self, context: Context) -> bool {
        if self.context == context {
            return true;
        }
        if !self.driver.set_context(context) {
            debug!(driver = self.driver.name(), ?context, "context rejected");
            return false;
        }
        self.context = context;
        true
    }

    pub fn acquired(&self) -> bool {
        self.driver.acquired()
    }

    pub fn acquire(&mut self) -> bool {
        self.driver.acquire()
    }

    pub fn release(&mut self) -> bool {
        self.driver.release()
    }

    /// Full device snapshot from the active driver. Change notifications are
    /// delivered to the sink from inside this call.
    pub fn poll(&mut self) -> Vec<SharedDevice> {
        self.driver.poll(&mut self.notifier)
    }

    pub fn rumble(&mut self, id: DeviceId, enable: bool) -> bool {
        self.driver.rumble(id, enable)
    }

    /// Register the change sink, replacing any previous one.
    pub fn on_change(&mut self, sink: impl FnMut(&Change) + Send + 'static) {
        self.notifier.set(sink);
    }

    pub fn clear_change(&mut self) {
        self.notifier.clear();
    }

    /// Deliver a change to the sink, as a driver does while polling.
    pub fn do_change(&mut self, change: &Change) {
        self.notifier.notify(change);
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Input")
            .field("driver", &self.driver.name())
            .field("registry", &self.registry)
            .field("context", &self.context)
            .field("notifier", &self.notifier)
            .finish()
    }
}
