//! Idle-time sources
//!
//! Reports how long the user has been away from keyboard and mouse:
//! - ext-idle-notify-v1 (Wayland compositors: Sway, Hyprland, Niri, KDE Plasma, ...)
//! - `xprintidle` (X11 sessions)
//!
//! Sources never fail at read time. A broken source reports 0 ("not idle")
//! so a query failure can never trigger a switch.

mod wayland;
mod xprintidle;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use wayland::WaylandIdleSource;
pub use xprintidle::XprintidleSource;

/// Anything that can report milliseconds since the last input event
pub trait IdleSource: Send + Sync {
    /// Milliseconds since the last keyboard/mouse input; 0 on query failure
    fn idle_millis(&self) -> u64;

    /// Short name for logs and status output
    fn name(&self) -> &'static str;

    /// How long after opening the first reading becomes meaningful
    ///
    /// Event-driven sources only learn the idle state from their first event.
    fn settle_time(&self) -> Duration {
        Duration::ZERO
    }
}

/// Configured idle source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleSourceKind {
    /// Prefer Wayland, fall back to `xprintidle`
    #[default]
    Auto,
    Wayland,
    Xprintidle,
}

impl fmt::Display for IdleSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Wayland => write!(f, "wayland"),
            Self::Xprintidle => write!(f, "xprintidle"),
        }
    }
}

/// Open the configured idle source
///
/// # Errors
/// Returns [`Error::DependencyMissing`] if the requested source (or, for
/// `auto`, every source) is unavailable.
pub fn open(kind: IdleSourceKind) -> Result<Arc<dyn IdleSource>> {
    match kind {
        IdleSourceKind::Wayland => Ok(Arc::new(WaylandIdleSource::connect()?)),
        IdleSourceKind::Xprintidle => Ok(Arc::new(XprintidleSource::probe()?)),
        IdleSourceKind::Auto => {
            if std::env::var_os("WAYLAND_DISPLAY").is_some() {
                match WaylandIdleSource::connect() {
                    Ok(source) => {
                        info!("Using ext-idle-notify-v1 idle source");
                        return Ok(Arc::new(source));
                    }
                    Err(e) => debug!("Wayland idle source unavailable: {}", e),
                }
            }

            XprintidleSource::probe()
                .map(|source| {
                    info!("Using xprintidle idle source");
                    Arc::new(source) as Arc<dyn IdleSource>
                })
                .map_err(|_| Error::DependencyMissing {
                    missing: vec!["ext-idle-notify-v1 or xprintidle".to_string()],
                    hint: "No idle-time source is available.\n\
                           - Wayland: use a compositor that supports ext-idle-notify-v1\n\
                           - X11: install xprintidle (e.g. apt install xprintidle)"
                        .to_string(),
                })
        }
    }
}

/// Idle clock fed by event-driven sources
///
/// Stores the instant input stopped; `None` while the user is active.
#[derive(Debug, Default)]
pub(crate) struct IdleClock {
    idle_since: Mutex<Option<Instant>>,
}

impl IdleClock {
    /// Record that input stopped `already_idle_for` ago
    pub fn mark_idle(&self, already_idle_for: Duration) {
        let now = Instant::now();
        let since = now.checked_sub(already_idle_for).unwrap_or(now);
        if let Ok(mut guard) = self.idle_since.lock() {
            *guard = Some(since);
        }
    }

    /// Record fresh input
    pub fn mark_active(&self) {
        if let Ok(mut guard) = self.idle_since.lock() {
            *guard = None;
        }
    }

    pub fn idle_millis(&self) -> u64 {
        let Ok(guard) = self.idle_since.lock() else {
            return 0;
        };
        guard.map_or(0, |since| {
            u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
        })
    }
}
