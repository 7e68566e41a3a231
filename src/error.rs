//! Error taxonomy
//!
//! Typed errors for the switching core. Startup failures (`DependencyMissing`,
//! `DeviceNotFound`) and directory outages (`Enumeration`, `Query`) are fatal;
//! `Switch` is recovered by the state machine, which stays armed and retries
//! on the next tick.

use thiserror::Error;

/// Errors raised by the device directory, idle sources, and target resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A required tool or protocol is not available on this system
    #[error("Missing required dependencies: {}\n\n{hint}", missing.join(", "))]
    DependencyMissing { missing: Vec<String>, hint: String },

    /// The configured target substring matched no playback device
    #[error(
        "No playback device matches '{query}'. Available devices: [{}]",
        available.join(", ")
    )]
    DeviceNotFound {
        query: String,
        available: Vec<String>,
    },

    /// Playback devices could not be listed
    #[error("Failed to enumerate playback devices: {0}")]
    Enumeration(String),

    /// The current default device could not be queried
    #[error("Failed to query default playback device: {0}")]
    Query(String),

    /// A single attempt to change the default device was rejected
    #[error("Failed to switch default device to '{id}': {reason}")]
    Switch { id: String, reason: String },
}

impl Error {
    /// Whether the monitoring loop can continue after this error
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Switch { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
