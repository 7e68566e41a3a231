//! ext-idle-notify-v1 protocol implementation
//!
//! The compositor sends `idled` once no input has arrived for the requested
//! timeout and `resumed` on the next input. Idle time is derived from those
//! two edges, so no polling of the compositor is needed.
//!
//! Version 2 of the notifier offers an input-only notification that ignores
//! idle inhibitors, so a playing video does not hold idle time at 0. Against a
//! version 1 notifier the regular notification is used, and any inhibitor
//! (media players, browsers playing audio) keeps the user "active".

use color_eyre::eyre::{self, Context};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, trace};
use wayland_client::{
    Connection, Dispatch, Proxy, QueueHandle,
    globals::{GlobalListContents, registry_queue_init},
    protocol::{wl_registry, wl_seat},
};
use wayland_protocols::ext::idle_notify::v1::client::{
    ext_idle_notification_v1, ext_idle_notifier_v1,
};

use super::{IdleClock, IdleSource};
use crate::error::{Error, Result};

/// Notification timeout; idle periods shorter than this read as 0
const NOTIFY_TIMEOUT_MS: u32 = 1000;

/// Which idle notification request the bound notifier supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NotificationKind {
    /// `get_input_idle_notification` (v2): input only, inhibitors ignored
    InputOnly,
    /// `get_idle_notification` (v1): idle inhibitors are respected
    InhibitorAware,
}

impl NotificationKind {
    fn for_version(version: u32) -> Self {
        if version >= 2 {
            Self::InputOnly
        } else {
            Self::InhibitorAware
        }
    }
}

/// Event-driven idle source backed by the compositor
pub struct WaylandIdleSource {
    clock: Arc<IdleClock>,
}

impl WaylandIdleSource {
    /// Connect to the compositor and start the idle notification thread
    ///
    /// # Errors
    /// Returns [`Error::DependencyMissing`] if no Wayland display is reachable
    /// or the compositor does not advertise `ext_idle_notifier_v1`.
    pub fn connect() -> Result<Self> {
        let missing = |reason: String| Error::DependencyMissing {
            missing: vec!["ext_idle_notifier_v1".to_string()],
            hint: reason,
        };

        let conn = Connection::connect_to_env()
            .map_err(|e| missing(format!("Failed to connect to Wayland display: {e}")))?;

        // Bind on this thread so a missing protocol is reported at startup
        let (globals, event_queue) = registry_queue_init::<IdleState>(&conn)
            .map_err(|e| missing(format!("Failed to initialize Wayland registry: {e}")))?;
        let qh = event_queue.handle();

        let seat: wl_seat::WlSeat = globals
            .bind(&qh, 1..=1, ())
            .map_err(|e| missing(format!("No wl_seat available: {e}")))?;
        let notifier: ext_idle_notifier_v1::ExtIdleNotifierV1 =
            globals.bind(&qh, 1..=2, ()).map_err(|e| {
                missing(format!(
                    "Compositor does not support ext-idle-notify-v1: {e}"
                ))
            })?;

        let notification = match NotificationKind::for_version(notifier.version()) {
            NotificationKind::InputOnly => {
                notifier.get_input_idle_notification(NOTIFY_TIMEOUT_MS, &seat, &qh, ())
            }
            NotificationKind::InhibitorAware => {
                debug!(
                    "ext_idle_notifier_v1 is version {}, idle inhibitors will hold idle time at 0",
                    notifier.version()
                );
                notifier.get_idle_notification(NOTIFY_TIMEOUT_MS, &seat, &qh, ())
            }
        };
        debug!(
            "Registered idle notification (timeout: {}ms)",
            NOTIFY_TIMEOUT_MS
        );

        let clock = Arc::new(IdleClock::default());
        let state = IdleState {
            clock: Arc::clone(&clock),
        };

        std::thread::spawn(move || {
            // Keep protocol objects alive for the lifetime of the thread
            let _objects = (conn, seat, notifier, notification);
            if let Err(e) = run_event_loop(event_queue, state) {
                error!("Wayland idle event loop error: {:#}", e);
            }
        });

        Ok(Self { clock })
    }
}

impl IdleSource for WaylandIdleSource {
    fn idle_millis(&self) -> u64 {
        self.clock.idle_millis()
    }

    fn name(&self) -> &'static str {
        "ext-idle-notify-v1"
    }

    fn settle_time(&self) -> Duration {
        Duration::from_millis(u64::from(NOTIFY_TIMEOUT_MS) + 250)
    }
}

/// Dispatch state owned by the Wayland thread
struct IdleState {
    clock: Arc<IdleClock>,
}

impl Dispatch<ext_idle_notification_v1::ExtIdleNotificationV1, ()> for IdleState {
    fn event(
        state: &mut Self,
        _proxy: &ext_idle_notification_v1::ExtIdleNotificationV1,
        event: ext_idle_notification_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        use ext_idle_notification_v1::Event;

        match event {
            Event::Idled => {
                trace!("Compositor reports idle");
                state
                    .clock
                    .mark_idle(Duration::from_millis(u64::from(NOTIFY_TIMEOUT_MS)));
            }
            Event::Resumed => {
                trace!("Compositor reports activity");
                state.clock.mark_active();
            }
            _ => {}
        }
    }
}

impl Dispatch<ext_idle_notifier_v1::ExtIdleNotifierV1, ()> for IdleState {
    fn event(
        _state: &mut Self,
        _proxy: &ext_idle_notifier_v1::ExtIdleNotifierV1,
        _event: ext_idle_notifier_v1::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // No-op: the notifier has no events
    }
}

impl Dispatch<wl_seat::WlSeat, ()> for IdleState {
    fn event(
        _state: &mut Self,
        _proxy: &wl_seat::WlSeat,
        _event: wl_seat::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // No-op: capabilities don't matter for idle tracking
    }
}

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for IdleState {
    fn event(
        _state: &mut Self,
        _proxy: &wl_registry::WlRegistry,
        _event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // No-op: we handle registry in the init phase
    }
}

/// Dispatch idle events until the compositor disconnects
fn run_event_loop(
    mut event_queue: wayland_client::EventQueue<IdleState>,
    mut state: IdleState,
) -> eyre::Result<()> {
    loop {
        if let Err(e) = event_queue.blocking_dispatch(&mut state) {
            // Report "active" from now on rather than a frozen idle reading
            state.clock.mark_active();
            debug!("Wayland event dispatch ended: {}", e);
            return Err(e).context("Wayland event dispatch failed");
        }
    }
}
