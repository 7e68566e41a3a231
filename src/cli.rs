//! Command-line interface definitions
//!
//! Uses clap for argument parsing with derive macros.

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::config::Overrides;

/// IDLESW - Idle Switcher
///
/// Switch the default audio output when you step away from the computer.
#[derive(Parser)]
#[command(name = "idlesw")]
#[command(version)]
#[command(about = "Idle Switcher - Switch the PipeWire default output after a period of inactivity")]
#[command(after_help = "\
BEHAVIOR:
  - The daemon samples keyboard/mouse idle time once per second
  - Once idle time reaches the threshold, the default output switches to the target
  - It switches at most once per idle period; any input re-arms it
  - A failed switch is retried every second while you stay idle
  - Stopping the daemon leaves the output where it is

DAEMON:
  idlesw daemon                  Run in the foreground with a progress line
  idlesw daemon --no-progress    Plain log output (for systemd/scripts)
  idlesw status                  Query daemon status (or just: idlesw)
  idlesw shutdown                Gracefully stop the daemon

QUERY COMMANDS:
  idlesw list-sinks              List playback devices, marking target matches
  idlesw idle                    Print the current idle time
  idlesw validate                Validate the config file

IPC SOCKET:
  $XDG_RUNTIME_DIR/idlesw.sock (or /tmp/idlesw-$UID.sock)

IDLE SOURCES:
  Wayland: ext-idle-notify-v1 (Sway, Hyprland, Niri, KDE Plasma, ...)
  X11: xprintidle")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the switcher in the foreground
    Daemon {
        #[command(flatten)]
        overrides: OverrideArgs,

        /// Don't draw the progress line; log to stderr instead
        #[arg(long)]
        no_progress: bool,
    },

    /// Query daemon status via IPC
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Gracefully shutdown the daemon
    Shutdown,

    /// List PipeWire playback devices
    ListSinks {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Print how long input has been idle
    Idle {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Validate config file (local, no daemon needed)
    Validate,
}

/// Per-run overrides of the config file
#[derive(ClapArgs, Debug, Default)]
pub struct OverrideArgs {
    /// Substring of the target device name
    #[arg(short, long, value_name = "NAME")]
    pub target: Option<String>,

    /// Idle seconds before switching
    #[arg(short = 's', long, value_name = "SECS")]
    pub threshold: Option<u64>,

    /// Match the target name case-sensitively
    #[arg(long, conflicts_with = "ignore_case")]
    pub match_case: bool,

    /// Match the target name case-insensitively
    #[arg(long)]
    pub ignore_case: bool,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        let match_case = if args.match_case {
            Some(true)
        } else if args.ignore_case {
            Some(false)
        } else {
            None
        };

        Self {
            target: args.target,
            threshold_secs: args.threshold,
            match_case,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_daemon_overrides_parse() {
        let args = Args::try_parse_from([
            "idlesw", "daemon", "--target", "Headset", "-s", "15", "--ignore-case",
        ])
        .unwrap();

        let Some(Command::Daemon {
            overrides,
            no_progress,
        }) = args.command
        else {
            panic!("expected daemon command");
        };
        assert!(!no_progress);

        let overrides = Overrides::from(overrides);
        assert_eq!(overrides.target.as_deref(), Some("Headset"));
        assert_eq!(overrides.threshold_secs, Some(15));
        assert_eq!(overrides.match_case, Some(false));
    }

    #[test]
    fn test_case_flags_conflict() {
        assert!(Args::try_parse_from(["idlesw", "daemon", "--match-case", "--ignore-case"]).is_err());
    }

    #[test]
    fn test_no_subcommand_is_allowed() {
        let args = Args::try_parse_from(["idlesw"]).unwrap();
        assert!(args.command.is_none());
    }
}
