//! Device directory abstraction
//!
//! The switching core only needs three operations from the audio system:
//! list playback devices, read the current default, and set a new default.
//! `PipeWire` implements this in production; tests provide in-memory fakes.

use serde::Serialize;

use crate::error::Result;

/// A playback endpoint as reported by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackDevice {
    /// Stable identifier used for switching (`PipeWire` node name)
    pub id: String,
    /// Human-readable display name, used for substring matching
    pub name: String,
    pub is_default: bool,
}

/// Source of playback devices and owner of the default-device setting
pub trait DeviceDirectory: Send + Sync {
    /// List playback-capable devices in directory order
    ///
    /// # Errors
    /// Returns [`Error::Enumeration`](crate::error::Error::Enumeration) if the
    /// audio subsystem is unreachable.
    fn list_playback_devices(&self) -> Result<Vec<PlaybackDevice>>;

    /// Identifier of the current default playback device
    ///
    /// # Errors
    /// Returns [`Error::Query`](crate::error::Error::Query) if the audio
    /// subsystem is unreachable or reports no default.
    fn current_default(&self) -> Result<String>;

    /// Make `id` the default playback device
    ///
    /// Either the default changed or it did not; there is no partial effect.
    ///
    /// # Errors
    /// Returns [`Error::Switch`](crate::error::Error::Switch) if the id is
    /// unknown or the change is rejected.
    fn set_default(&self, id: &str) -> Result<()>;
}
