//! Inactivity state machine
//!
//! Decides, once per tick, whether the default playback device should be
//! switched to the target. The machine fires at most one successful switch
//! per idle episode:
//!
//! - `Armed` + idle ≥ threshold → switch (or adopt, if the target is already
//!   the default) and move to `Switched`. A failed switch stays `Armed`, so
//!   the next tick retries while the idle condition still holds.
//! - `Switched` + idle < rearm threshold → back to `Armed`.
//!
//! The rearm threshold is much smaller than the switch threshold so only a
//! fresh input event re-arms the machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;
use tracing::{debug, info, warn};

use crate::directory::DeviceDirectory;
use crate::events::SwitchEvent;

/// Default idle value below which the user counts as freshly active
pub const DEFAULT_REARM_BELOW_MS: u64 = 1000;

/// Machine phase within the current idle episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// A switch will happen when the threshold is next crossed
    #[default]
    Armed,
    /// Already switched for this episode; waiting for activity
    Switched,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Armed => write!(f, "armed"),
            Self::Switched => write!(f, "switched"),
        }
    }
}

/// The device to switch to, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDevice {
    pub id: String,
    pub name: String,
}

/// One consistent reading taken at a tick instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub idle_ms: u64,
    pub current_default: String,
}

/// Percentage of the way to the switch threshold, clamped at 100
#[must_use]
pub fn percent_complete(idle_ms: u64, threshold_ms: NonZeroU64) -> u8 {
    let percent = u128::from(idle_ms) * 100 / u128::from(threshold_ms.get());
    percent.min(100) as u8
}

/// Idle-triggered device switcher
#[derive(Debug, Clone)]
pub struct IdleSwitcher {
    target: TargetDevice,
    threshold_ms: NonZeroU64,
    rearm_below_ms: u64,
    phase: Phase,
}

impl IdleSwitcher {
    /// Create an armed switcher
    #[must_use]
    pub fn new(target: TargetDevice, threshold_ms: NonZeroU64, rearm_below_ms: u64) -> Self {
        Self {
            target,
            threshold_ms,
            rearm_below_ms,
            phase: Phase::Armed,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn target(&self) -> &TargetDevice {
        &self.target
    }

    #[must_use]
    pub fn threshold_ms(&self) -> NonZeroU64 {
        self.threshold_ms
    }

    #[must_use]
    pub fn rearm_below_ms(&self) -> u64 {
        self.rearm_below_ms
    }

    /// Advance the machine by one tick
    ///
    /// Issues at most one `set_default` call. Returns the events produced by
    /// this tick, always ending with a `StatusTick` carrying the new phase.
    pub fn tick(&mut self, sample: &Sample, directory: &dyn DeviceDirectory) -> Vec<SwitchEvent> {
        let mut events = Vec::new();
        let idle_ms = sample.idle_ms;

        match self.phase {
            Phase::Armed if idle_ms >= self.threshold_ms.get() => {
                if sample.current_default == self.target.id {
                    info!(
                        "Idle for {}s, already on {}; nothing to switch",
                        idle_ms / 1000,
                        self.target.name
                    );
                    self.phase = Phase::Switched;
                } else {
                    events.push(SwitchEvent::SwitchAttempted {
                        target: self.target.name.clone(),
                        from: sample.current_default.clone(),
                    });

                    match directory.set_default(&self.target.id) {
                        Ok(()) => {
                            info!("Idle for {}s, switched to {}", idle_ms / 1000, self.target.name);
                            self.phase = Phase::Switched;
                            events.push(SwitchEvent::SwitchSucceeded {
                                target: self.target.name.clone(),
                            });
                        }
                        Err(e) => {
                            warn!("Switch attempt failed, retrying next tick: {}", e);
                            events.push(SwitchEvent::SwitchFailed {
                                target: self.target.name.clone(),
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
            Phase::Switched if idle_ms < self.rearm_below_ms => {
                info!("Activity detected, ready for next idle period");
                self.phase = Phase::Armed;
                events.push(SwitchEvent::Rearmed { idle_ms });
            }
            _ => {}
        }

        let percent = percent_complete(idle_ms, self.threshold_ms);
        debug!("Tick: idle={}ms ({}%), phase={}", idle_ms, percent, self.phase);
        events.push(SwitchEvent::StatusTick {
            idle_ms,
            percent,
            phase: self.phase,
        });

        events
    }
}
