//! Crate error type.
//!
//! Most of hidbind degrades instead of failing (an unknown backend becomes the
//! `None` driver, an unresolvable binding becomes unbound). [`Error`] covers the
//! places where a caller hands us text to parse and deserves to know why it
//! was rejected.

use thiserror::Error;

/// Errors produced while parsing assignment strings or configuration text.
#[derive(Debug, Error)]
pub enum Error {
    /// An assignment string had fewer than the four mandatory fields.
    #[error("assignment has {0} field(s), expected at least 4")]
    TooFewFields(usize),

    /// The device identity field was not a 64-bit hexadecimal number.
    #[error("invalid device id `{0}`")]
    InvalidDeviceId(String),

    /// TOML text could not be deserialized.
    #[error("failed to parse TOML: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// A value could not be serialized to TOML.
    #[error("failed to serialize TOML: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
