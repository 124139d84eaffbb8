//! Backend registry.
//!
//! Backends are selected by exact name at runtime. hidbind itself only ships
//! the in-memory [`virtual_input`] backend; OS backends (`udev`, `Windows`, ...)
//! live in the embedding application and are registered here with a factory.
//!
//! # Priority
//! When no name is given, [`DriverRegistry::optimal`] picks the first registered
//! backend in the fixed order [`PRIORITY`], then any other registered backend in
//! registration order, and finally `"None"`.

use crate::driver::{InputDriver, NullDriver, NONE};
use std::fmt;

pub mod virtual_input;

/// Preference order of the well-known OS backends.
pub const PRIORITY: [&str; 6] = ["Windows", "Quartz", "Carbon", "udev", "SDL", "Xlib"];

/// Builds a fresh driver instance.
pub type DriverFactory = Box<dyn Fn() -> Box<dyn InputDriver> + Send + Sync>;

/// Named driver factories.
#[derive(Default)]
pub struct DriverRegistry {
    entries: Vec<(String, DriverFactory)>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn InputDriver> + Send + Sync + 'static,
    {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = Box::new(factory),
            None => self.entries.push((name, Box::new(factory))),
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn InputDriver> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    /// Registered names in priority order, followed by `"None"`.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = PRIORITY
            .iter()
            .filter(|name| self.contains(name))
            .map(|name| name.to_string())
            .collect();
        names.extend(
            self.entries
                .iter()
                .map(|(name, _)| name.clone())
                .filter(|name| !PRIORITY.contains(&name.as_str()) && name != NONE),
        );
        names.push(NONE.to_string());
        names
    }

    /// `true` for any registered name and for `"None"`.
    pub fn has(&self, name: &str) -> bool {
        name == NONE || self.contains(name)
    }

    /// Best available backend.
    pub fn optimal(&self) -> String {
        self.names().swap_remove(0)
    }

    /// Most conservative backend. Same order as [`optimal`](Self::optimal).
    pub fn safest(&self) -> String {
        self.optimal()
    }

    /// Instantiate `name`, or `None` if it is not registered.
    pub fn build(&self, name: &str) -> Option<Box<dyn InputDriver>> {
        if name == NONE {
            return Some(Box::new(NullDriver));
        }
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, factory)| factory())
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(name, _)| name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl InputDriver for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn empty_registry_only_offers_none() {
        let registry = DriverRegistry::new();
        assert_eq!(registry.names(), vec!["None"]);
        assert_eq!(registry.optimal(), "None");
        assert!(registry.has("None"));
        assert!(!registry.has("udev"));
        assert_eq!(registry.build("None").unwrap().name(), "None");
        assert!(registry.build("udev").is_none());
    }

    #[test]
    fn priority_order_beats_registration_order() {
        let registry = DriverRegistry::new()
            .with("Virtual", || Box::new(Named("Virtual")))
            .with("SDL", || Box::new(Named("SDL")))
            .with("udev", || Box::new(Named("udev")));

        assert_eq!(registry.names(), vec!["udev", "SDL", "Virtual", "None"]);
        assert_eq!(registry.optimal(), "udev");
        assert_eq!(registry.safest(), "udev");
        assert_eq!(registry.build("SDL").unwrap().name(), "SDL");
    }

    #[test]
    fn re_registering_replaces_the_factory() {
        let mut registry = DriverRegistry::new();
        registry.register("Virtual", || Box::new(Named("first")));
        registry.register("Virtual", || Box::new(Named("second")));
        assert_eq!(registry.names(), vec!["Virtual", "None"]);
        assert_eq!(registry.build("Virtual").unwrap().name(), "second");
    }
}
