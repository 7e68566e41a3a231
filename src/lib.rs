//! `IDLESW` - Idle Switcher
//!
//! Switches the default `PipeWire` playback device to a chosen target once the
//! user has been away from keyboard and mouse for a configured time. Switches
//! at most once per idle period and re-arms on the next input.
//! Uses `PipeWire` native tools (`pw-dump`, `pw-metadata`) for audio control.
//!
//! # Idle Sources
//! - Wayland compositors with ext-idle-notify-v1 (Sway, Hyprland, Niri, KDE Plasma, ...)
//! - X11 via `xprintidle`

pub mod cli;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod directory;
pub mod error;
pub mod events;
pub mod idle;
pub mod ipc;
pub mod logging;
pub mod machine;
pub mod monitor;
pub mod notification;
pub mod pipewire;
pub mod presentation;
pub mod resolve;
pub mod style;

#[cfg(test)]
mod test_utils;

/// Build-time metadata generated by `built`
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Package version, with the short git commit when built from a checkout
#[must_use]
pub fn version_string() -> String {
    match built_info::GIT_COMMIT_HASH_SHORT {
        Some(hash) => format!("{} ({hash})", built_info::PKG_VERSION),
        None => built_info::PKG_VERSION.to_string(),
    }
}

// Re-export commonly used types for convenience
pub use cli::Args;
pub use config::Config;
pub use directory::{DeviceDirectory, PlaybackDevice};
pub use error::Error;
pub use events::SwitchEvent;
pub use idle::IdleSource;
pub use machine::{IdleSwitcher, Phase, Sample, TargetDevice};
pub use monitor::Monitor;
