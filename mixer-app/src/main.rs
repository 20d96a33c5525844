//! Command line front end for the audio mixer.
//!
//! Loads the configuration, runs the mixing engine on its own thread, and
//! shows live levels in the terminal.

mod cli;
mod commands;
mod display;
mod settings;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{CliArgs, Command};

/// Initialize logging.
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "audio_mixer=info,mixer_engine=info,mixer_audio=info".into()
            }),
        )
        // Stdout carries the level meter.
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args = CliArgs::parse();
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(settings::default_config_path);

    match args.command {
        Command::Run(run) => commands::run(run, &config_path).await,
        Command::Devices => commands::devices(),
        Command::Config => commands::show_config(&config_path),
    }
}
