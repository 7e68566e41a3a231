//! Monitoring loop
//!
//! Drives the [`IdleSwitcher`] on a fixed cadence until cancelled. Each tick
//! reads the idle time and the current default device as one sample, feeds
//! it to the machine and forwards the resulting events.

use color_eyre::eyre::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::directory::DeviceDirectory;
use crate::events::SwitchEvent;
use crate::idle::IdleSource;
use crate::machine::{IdleSwitcher, Sample};

/// Time between two samples
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Owns the switcher for the lifetime of the monitoring loop
pub struct Monitor {
    switcher: IdleSwitcher,
    idle: Arc<dyn IdleSource>,
    directory: Arc<dyn DeviceDirectory>,
    tick: Duration,
    events: mpsc::UnboundedSender<SwitchEvent>,
}

impl Monitor {
    #[must_use]
    pub fn new(
        switcher: IdleSwitcher,
        idle: Arc<dyn IdleSource>,
        directory: Arc<dyn DeviceDirectory>,
        events: mpsc::UnboundedSender<SwitchEvent>,
    ) -> Self {
        Self {
            switcher,
            idle,
            directory,
            tick: TICK_INTERVAL,
            events,
        }
    }

    /// Override the tick cadence (tests drive the loop faster than real time)
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Run until `cancel` fires
    ///
    /// Cancellation is checked before every tick; a tick already in flight
    /// finishes first, so the audio device is left exactly as the last tick
    /// set it. Returns the switcher in its final state.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::Query`] (wrapped in the report) when the
    /// current default device cannot be read, since no decision is possible
    /// without it. Failed switches are not errors here; the machine retries
    /// them on the next tick.
    pub async fn run(self, cancel: CancellationToken) -> Result<IdleSwitcher> {
        let Self {
            mut switcher,
            idle,
            directory,
            tick,
            events,
        } = self;

        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Monitoring idle time via {} every {}ms",
            idle.name(),
            tick.as_millis()
        );

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    debug!("Monitoring loop cancelled in phase {}", switcher.phase());
                    return Ok(switcher);
                }

                _ = interval.tick() => {
                    let idle = Arc::clone(&idle);
                    let directory = Arc::clone(&directory);

                    // Idle and directory queries block; the machine travels
                    // into the blocking pool and back so each tick stays atomic
                    let (next, tick_events) = tokio::task::spawn_blocking(move || {
                        let sample = Sample {
                            idle_ms: idle.idle_millis(),
                            current_default: directory.current_default()?,
                        };
                        let tick_events = switcher.tick(&sample, directory.as_ref());
                        Ok::<_, crate::error::Error>((switcher, tick_events))
                    })
                    .await
                    .context("Monitoring tick panicked")??;

                    switcher = next;

                    for event in tick_events {
                        // Receiver gone means nobody is presenting; keep switching
                        let _ = events.send(event);
                    }
                }
            }
        }
    }
}
