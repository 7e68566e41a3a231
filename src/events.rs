//! Events emitted by the switching core
//!
//! Consumed by the presentation layer (progress line, notifications) and
//! mirrored into the daemon's IPC status snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::machine::Phase;

/// Events produced by target resolution and by each monitoring tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SwitchEvent {
    /// Periodic status after every tick
    StatusTick {
        idle_ms: u64,
        /// Progress toward the switch threshold (0..=100)
        percent: u8,
        phase: Phase,
    },

    /// About to ask the directory to change the default device
    SwitchAttempted { target: String, from: String },

    /// The default device is now the target
    SwitchSucceeded { target: String },

    /// The directory rejected the switch; it will be retried next tick
    SwitchFailed { target: String, error: String },

    /// Fresh activity seen after a switch; ready for the next idle period
    Rearmed { idle_ms: u64 },

    /// Several devices matched the target query at startup
    AmbiguousTarget {
        query: String,
        chosen: String,
        candidates: Vec<String>,
    },
}

impl fmt::Display for SwitchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatusTick {
                idle_ms,
                percent,
                phase,
            } => write!(f, "idle {}s ({percent}%) [{phase}]", idle_ms / 1000),
            Self::SwitchAttempted { target, from } => {
                write!(f, "Switching {from} → {target}")
            }
            Self::SwitchSucceeded { target } => write!(f, "Switched to {target}"),
            Self::SwitchFailed { target, error } => {
                write!(f, "Switch to {target} failed: {error}")
            }
            Self::Rearmed { .. } => write!(f, "Activity detected, ready for next idle period"),
            Self::AmbiguousTarget {
                query,
                chosen,
                candidates,
            } => write!(
                f,
                "'{query}' matches {} devices ({}); using '{chosen}'",
                candidates.len(),
                candidates.join(", ")
            ),
        }
    }
}
