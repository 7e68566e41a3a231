//! CLI commands
//!
//! Local commands (list-sinks, idle, validate) talk to PipeWire and the idle
//! source directly; status and shutdown go through the daemon's IPC socket.

use color_eyre::eyre::{self, Result};
use crossterm::style::Stylize;
use serde::Serialize;

use crate::config::Config;
use crate::directory::{DeviceDirectory, PlaybackDevice};
use crate::idle::{self, IdleSourceKind};
use crate::ipc::{self, DaemonStatus, Request, Response};
use crate::machine::Phase;
use crate::pipewire::PipeWire;
use crate::resolve::{MatchCase, resolve_target};
use crate::style::IdleswStyle;

// ============================================================================
// Local Commands (no daemon needed)
// ============================================================================

#[derive(Debug, Serialize)]
struct DeviceJson<'a> {
    #[serde(flatten)]
    device: &'a PlaybackDevice,
    matches_target: bool,
}

#[derive(Debug, Serialize)]
struct ListSinksJson<'a> {
    devices: Vec<DeviceJson<'a>>,
    target_query: Option<&'a str>,
    /// Node name the daemon would switch to
    target: Option<String>,
}

/// Print the playback device list, marking the default and target matches
///
/// `highlight` is the target query and its case policy.
pub fn print_devices(devices: &[PlaybackDevice], highlight: Option<(&str, MatchCase)>) {
    println!("{}", "PLAYBACK DEVICES:".header());
    println!("{}", "-".repeat(17));

    if devices.is_empty() {
        println!("  {}", "(none)".dim());
        return;
    }

    let chosen = highlight
        .and_then(|(query, case)| resolve_target(devices, query, case).ok())
        .map(|r| r.target.id);

    for device in devices {
        let marker = if device.is_default { "* " } else { "  " };
        let name = if chosen.as_deref() == Some(device.id.as_str()) {
            format!("{} {}", device.name.as_str().bold(), "[target]".success())
        } else if highlight.is_some_and(|(query, case)| case.contains(&device.name, query)) {
            format!("{} {}", device.name.as_str().bold(), "[also matches]".warning())
        } else {
            device.name.as_str().bold().to_string()
        };
        println!("{marker}{name}");
        println!("    {}", device.id.as_str().dim());
    }
    println!("\n  {} = current default", "*".dim());
}

/// List playback devices
///
/// # Errors
/// Returns an error if `PipeWire` cannot be queried or JSON serialization fails.
pub fn list_sinks(config: Option<&Config>, json_output: bool) -> Result<()> {
    let devices = PipeWire.list_playback_devices()?;
    let query = config.map(|c| (c.settings.target.as_str(), c.match_case()));

    if json_output {
        let output = ListSinksJson {
            devices: devices
                .iter()
                .map(|device| DeviceJson {
                    device,
                    matches_target: query.is_some_and(|(q, case)| case.contains(&device.name, q)),
                })
                .collect(),
            target_query: query.map(|(q, _)| q),
            target: query
                .and_then(|(q, case)| resolve_target(&devices, q, case).ok())
                .map(|r| r.target.id),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_devices(&devices, query);

        if let Some((q, _)) = query {
            println!("  {} {}", "Target query:".dim(), q.technical());
        }
        if let Ok(path) = Config::get_config_path() {
            println!("\n{} {}", "Config:".dim(), path.display());
        }
    }

    Ok(())
}

/// Print the current idle time
///
/// # Errors
/// Returns an error if no idle source is available.
pub async fn idle(kind: IdleSourceKind, json_output: bool) -> Result<()> {
    let source = idle::open(kind)?;
    let settle = source.settle_time();
    if !settle.is_zero() {
        tokio::time::sleep(settle).await;
    }

    let idle_ms = source.idle_millis();

    if json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "source": source.name(),
                "idle_ms": idle_ms,
            }))?
        );
    } else {
        println!(
            "{} {} {}",
            "Idle:".dim(),
            format!("{:.1}s", idle_ms as f64 / 1000.0).technical(),
            format!("(via {})", source.name()).dim()
        );
    }

    Ok(())
}

/// Validate the config and check the target against the current device list
///
/// # Errors
/// Returns an error if the config is invalid.
pub fn validate(config: &Config) -> Result<()> {
    config.print_summary();

    println!();
    match PipeWire.list_playback_devices() {
        Ok(devices) => {
            match resolve_target(&devices, &config.settings.target, config.match_case()) {
                Ok(resolution) => {
                    println!(
                        "{} {} ({})",
                        "Target resolves to:".success(),
                        resolution.target.name.as_str().bold(),
                        resolution.target.id.as_str().dim()
                    );
                    if let Some(warning) = resolution.warning {
                        println!("{} {}", "Warning:".warning(), warning);
                    }
                }
                Err(e) => println!("{} {}", "Target:".error(), e),
            }
        }
        Err(e) => println!("{} {}", "Could not check target:".warning(), e),
    }

    Ok(())
}

/// Format uptime in human-readable form
fn format_uptime(secs: u64) -> String {
    const SECS_PER_MINUTE: u64 = 60;
    const SECS_PER_HOUR: u64 = 3600;

    if secs < SECS_PER_MINUTE {
        return format!("{secs}s");
    }
    if secs < SECS_PER_HOUR {
        return format!("{mins}m", mins = secs / SECS_PER_MINUTE);
    }
    let hours = secs / SECS_PER_HOUR;
    let mins = (secs % SECS_PER_HOUR) / SECS_PER_MINUTE;
    if mins > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{hours}h")
    }
}

// ============================================================================
// IPC-based Commands (require daemon)
// ============================================================================

/// Query the current output and the daemon status (hybrid local+IPC command)
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub async fn status(json_output: bool) -> Result<()> {
    // The current output is informative only; the daemon may still be reachable
    let current = PipeWire
        .list_playback_devices()
        .ok()
        .and_then(|devices| devices.into_iter().find(|d| d.is_default));

    let daemon = if ipc::is_daemon_running().await {
        match ipc::send_request(Request::Status).await {
            Ok(Response::Status(status)) => Some(status),
            _ => None,
        }
    } else {
        None
    };

    if json_output {
        let daemon_json = match &daemon {
            Some(status) => {
                let mut value = serde_json::to_value(status)?;
                value["running"] = serde_json::Value::Bool(true);
                value["uptime_human"] =
                    serde_json::Value::String(format_uptime(status.uptime_secs));
                value
            }
            None => serde_json::json!({ "running": false }),
        };

        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "current_output": current,
                "daemon": daemon_json,
            }))?
        );
        return Ok(());
    }

    println!("{}", "Audio Output".header());
    println!("{}", "-".repeat(12));
    match &current {
        Some(device) => println!("{} {}", "Current:".dim(), device.name.as_str().bold()),
        None => println!("{} {}", "Current:".dim(), "unknown".warning()),
    }
    println!();
    println!("{}", "Daemon".header());
    println!("{}", "-".repeat(6));

    match daemon {
        Some(status) => print_daemon_status(&status),
        None => {
            println!("{} {}", "Status:".dim(), "Not running".error());
            println!("  Start with: {}", "idlesw daemon".technical());
        }
    }

    Ok(())
}

fn print_daemon_status(status: &DaemonStatus) {
    println!(
        "{} {}",
        "Status:".dim(),
        format!("Running (uptime: {})", format_uptime(status.uptime_secs)).success()
    );
    println!("{} {}", "Version:".dim(), status.version);
    println!(
        "{} {} {}",
        "Target:".dim(),
        status.target.as_str().bold(),
        format!("({})", status.target_id).dim()
    );

    let phase = match status.phase {
        Phase::Armed => status.phase.to_string().warning(),
        Phase::Switched => status.phase.to_string().success(),
    };
    println!("{} {}", "Phase:".dim(), phase);
    println!(
        "{} {}s of {}s ({}%)",
        "Idle:".dim(),
        (status.idle_ms / 1000).to_string().technical(),
        status.threshold_ms / 1000,
        status.percent
    );
    println!("{} {}", "Idle source:".dim(), status.idle_source);
    println!(
        "{} {}",
        "Switches:".dim(),
        status.switches.to_string().technical()
    );
}

/// Gracefully shutdown the daemon
///
/// # Errors
/// Returns an error if no daemon is running or IPC communication fails.
pub async fn shutdown() -> Result<()> {
    if !ipc::is_daemon_running().await {
        eyre::bail!("Daemon is not running");
    }

    match ipc::send_request(Request::Shutdown).await? {
        Response::Ok { message } => {
            println!("{}", message.success());
            Ok(())
        }
        Response::Error { message } => eyre::bail!("Error: {message}"),
        Response::Status(_) => eyre::bail!("Unexpected response from daemon"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::device;
    use test_case::test_case;

    #[test_case(0, "0s" ; "zero")]
    #[test_case(59, "59s" ; "under a minute")]
    #[test_case(600, "10m" ; "minutes")]
    #[test_case(3600, "1h" ; "exact hour")]
    #[test_case(5400, "1h 30m" ; "hours and minutes")]
    fn test_format_uptime(secs: u64, expected: &str) {
        assert_eq!(format_uptime(secs), expected);
    }

    #[test]
    fn test_list_sinks_json_marks_matches() {
        let devices = vec![
            device("alsa_output.usb-a", "USB Headset A"),
            device("alsa_output.speakers", "Speakers"),
        ];
        let output = ListSinksJson {
            devices: devices
                .iter()
                .map(|device| DeviceJson {
                    device,
                    matches_target: MatchCase::Insensitive.contains(&device.name, "headset"),
                })
                .collect(),
            target_query: Some("headset"),
            target: Some("alsa_output.usb-a".to_string()),
        };

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["devices"][0]["id"], "alsa_output.usb-a");
        assert_eq!(json["devices"][0]["matches_target"], true);
        assert_eq!(json["devices"][1]["matches_target"], false);
        assert_eq!(json["target"], "alsa_output.usb-a");
    }
}
