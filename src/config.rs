//! Input configuration.
//!
//! Text in, struct out. Reading and writing files is left to the application.

use crate::binding::BindingProfile;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default minimum time between two polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Backend name; empty selects the optimal one.
    pub driver: String,
    pub poll_interval_ms: u64,
    pub profile: BindingProfile,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            driver: String::new(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            profile: BindingProfile::new("default"),
        }
    }
}

impl InputConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
