//! IDLESW binary entry point
//!
//! Dispatches to daemon mode or subcommands based on CLI arguments.

use clap::Parser;
use color_eyre::eyre::Result;
use idlesw::{cli::Args, cli::Command, commands, config::Config, daemon, logging};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        // No subcommand - show status
        None => {
            logging::init_cli();
            commands::status(false).await
        }

        Some(Command::Status { json }) => {
            logging::init_cli();
            commands::status(json).await
        }

        // Daemon handles its own logging (file, plus stderr without the progress line)
        Some(Command::Daemon {
            overrides,
            no_progress,
        }) => {
            let config = Config::load()?.with_overrides(overrides.into())?;
            daemon::run(config, !no_progress).await
        }

        Some(Command::Shutdown) => {
            logging::init_cli();
            commands::shutdown().await
        }

        Some(Command::ListSinks { json }) => {
            logging::init_cli();
            let config = Config::load().ok();
            commands::list_sinks(config.as_ref(), json)
        }

        Some(Command::Idle { json }) => {
            logging::init_cli();
            let kind = Config::load()
                .map(|c| c.settings.idle_source)
                .unwrap_or_default();
            commands::idle(kind, json).await
        }

        Some(Command::Validate) => {
            logging::init_cli();
            let config = Config::load()?;
            commands::validate(&config)
        }
    }
}
