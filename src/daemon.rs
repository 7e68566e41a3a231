//! Daemon mode
//!
//! Resolves the target device once, then runs the monitoring loop while
//! serving IPC requests, presenting events and waiting for a stop signal.

use color_eyre::eyre::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::commands::print_devices;
use crate::config::Config;
use crate::directory::DeviceDirectory;
use crate::error::Error;
use crate::events::SwitchEvent;
use crate::idle::{self, IdleSource};
use crate::ipc::{self, DaemonStatus, IpcServer, Request, Response};
use crate::logging;
use crate::machine::{IdleSwitcher, Phase, TargetDevice};
use crate::monitor::Monitor;
use crate::notification::{device_icon, send_notification};
use crate::pipewire::PipeWire;
use crate::presentation::{self, StatusLine};
use crate::resolve::resolve_target;

/// A resolved target and the monitor that will switch to it
pub struct Startup {
    pub monitor: Monitor,
    pub target: TargetDevice,
    /// Set when the target query matched more than one device
    pub warning: Option<SwitchEvent>,
}

/// Resolve the configured target and build the monitor for it
///
/// Nothing is built when resolution fails, so the idle source is never read
/// and no switch is attempted.
///
/// # Errors
/// Returns [`Error::Enumeration`] if the device list cannot be read and
/// [`Error::DeviceNotFound`] if no device matches the target query.
pub fn prepare(
    config: &Config,
    directory: Arc<dyn DeviceDirectory>,
    idle_source: Arc<dyn IdleSource>,
    events: mpsc::UnboundedSender<SwitchEvent>,
) -> crate::error::Result<Startup> {
    let devices = directory.list_playback_devices()?;
    let resolution = resolve_target(&devices, &config.settings.target, config.match_case())?;

    let switcher = IdleSwitcher::new(
        resolution.target.clone(),
        config.threshold_ms(),
        config.settings.rearm_below_ms,
    );

    Ok(Startup {
        monitor: Monitor::new(switcher, idle_source, directory, events),
        target: resolution.target,
        warning: resolution.warning,
    })
}

/// Applies switcher events to the IPC status snapshot and the console
struct Reporter {
    status: DaemonStatus,
    status_line: StatusLine,
    target: TargetDevice,
    notify_switch: bool,
}

impl Reporter {
    fn handle(&mut self, event: &SwitchEvent) {
        match event {
            SwitchEvent::StatusTick {
                idle_ms,
                percent,
                phase,
            } => {
                self.status.idle_ms = *idle_ms;
                self.status.percent = *percent;
                self.status.phase = *phase;
            }
            SwitchEvent::SwitchSucceeded { .. } => {
                self.status.switches += 1;
                if self.notify_switch
                    && let Err(e) = send_notification(
                        "Audio Output Switched",
                        &event.to_string(),
                        Some(device_icon(&self.target.name, &self.target.id)),
                    )
                {
                    warn!("Could not send switch notification: {}", e);
                }
            }
            _ => {}
        }
        self.status_line.show(event);
    }

    /// Present whatever the monitor sent before it stopped
    fn drain(&mut self, events: &mut mpsc::UnboundedReceiver<SwitchEvent>) {
        while let Ok(event) = events.try_recv() {
            self.handle(&event);
        }
    }
}

/// Run the daemon until interrupted, terminated or shut down over IPC
///
/// # Errors
/// Returns an error if a dependency is missing, the target cannot be
/// resolved, another daemon is running, or the device directory becomes
/// unreachable while monitoring.
pub async fn run(config: Config, show_progress: bool) -> Result<()> {
    let settings = &config.settings;

    let _log_guard = logging::init_daemon(
        &settings.log_level,
        settings.log_max_bytes,
        !presentation::progress_enabled(show_progress),
    );

    info!("Starting IDLESW daemon v{}", crate::version_string());

    PipeWire::validate_tools()?;
    let idle_source = idle::open(settings.idle_source)?;
    let idle_name = idle_source.name();
    let directory: Arc<dyn DeviceDirectory> = Arc::new(PipeWire);

    // Bind before touching audio so a second daemon bails out early
    let ipc_server = IpcServer::bind().await?;
    info!("IPC server listening on {:?}", ipc_server.socket_path());

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let startup = match prepare(&config, Arc::clone(&directory), idle_source, event_tx) {
        Ok(startup) => startup,
        Err(e @ Error::DeviceNotFound { .. }) => {
            eprintln!("No playback device matches '{}'.\n", settings.target);
            if let Ok(devices) = directory.list_playback_devices() {
                print_devices(&devices, None);
            }
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    let target = startup.target;

    info!(
        "Target: {} ({}), threshold {}s",
        target.name, target.id, settings.threshold_secs
    );

    let mut reporter = Reporter {
        status: DaemonStatus {
            version: crate::version_string(),
            uptime_secs: 0,
            target: target.name.clone(),
            target_id: target.id.clone(),
            idle_source: idle_name.to_string(),
            phase: Phase::Armed,
            idle_ms: 0,
            percent: 0,
            threshold_ms: config.threshold_ms().get(),
            switches: 0,
        },
        status_line: StatusLine::new(show_progress, &target, config.threshold_ms().get()),
        target: target.clone(),
        notify_switch: settings.notify_switch,
    };

    if let Some(warning) = &startup.warning {
        warn!("{}", warning);
        reporter.status_line.show(warning);
    }

    let cancel = CancellationToken::new();
    let mut monitor = tokio::spawn(startup.monitor.run(cancel.child_token()));

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let start_time = Instant::now();

    if let Err(e) = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]) {
        warn!("Failed to notify systemd: {}", e);
    }

    if settings.notify_daemon
        && let Err(e) = send_notification(
            "IDLESW Started",
            &format!(
                "Switching to {} after {}s idle",
                target.name, settings.threshold_secs
            ),
            None,
        )
    {
        warn!("Could not send startup notification: {}", e);
    }

    info!("Monitoring idle time...");

    let outcome = loop {
        tokio::select! {
            Some(event) = event_rx.recv() => reporter.handle(&event),

            Some(mut stream) = ipc_server.accept() => {
                let mut snapshot = reporter.status.clone();
                snapshot.uptime_secs = start_time.elapsed().as_secs();
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_ipc_request(&mut stream, snapshot, &cancel).await {
                        error!("IPC request handling error: {:#}", e);
                    }
                });
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                cancel.cancel();
            }

            _ = sigterm.recv() => {
                info!("Terminated, shutting down");
                cancel.cancel();
            }

            joined = &mut monitor => {
                break joined.context("Monitoring task failed")?;
            }
        }
    };

    reporter.drain(&mut event_rx);
    reporter.status_line.finish();
    let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Stopping]);

    if settings.notify_daemon {
        let _ = send_notification("IDLESW Stopped", "Idle switcher stopped", None);
    }

    let switcher = outcome.inspect_err(|e| error!("Monitoring stopped: {:#}", e))?;
    info!(
        "Stopped in phase {} after {} switch(es)",
        switcher.phase(),
        reporter.status.switches
    );
    Ok(())
}

/// Handle a single IPC request from a client
///
/// A request that cannot be read is answered with [`Response::Error`] before
/// the error is returned.
async fn handle_ipc_request<S>(
    stream: &mut S,
    status: DaemonStatus,
    cancel: &CancellationToken,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = match ipc::read_request(stream).await {
        Ok(request) => request,
        Err(e) => {
            let reply = Response::Error {
                message: format!("{e:#}"),
            };
            // The client may already be gone; the read error is what matters
            let _ = ipc::write_response(stream, &reply).await;
            return Err(e);
        }
    };

    let response = match request {
        Request::Status => Response::Status(status),
        Request::Shutdown => {
            info!("Shutdown requested via IPC");
            cancel.cancel();
            Response::Ok {
                message: "Daemon shutting down".to_string(),
            }
        }
    };

    ipc::write_response(stream, &response).await
}
