//! Podweave CLI entry point.

use anyhow::Result;
use clap::Parser;
use podweave::cli::{commands, Cli, Commands};
use podweave::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli
        .config
        .as_deref()
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("podweave={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Execute command
    match &cli.command {
        Commands::Generate {
            inputs,
            longform,
            transcript_only,
            output,
            name,
        } => {
            std::fs::create_dir_all(settings.data_dir())?;
            commands::run_generate(
                inputs,
                *longform,
                *transcript_only,
                output.clone(),
                name.clone(),
                settings,
            )
            .await?;
        }

        Commands::Synthesize { transcript, output } => {
            std::fs::create_dir_all(settings.data_dir())?;
            commands::run_synthesize(transcript, output.clone(), settings).await?;
        }

        Commands::Export {
            transcript,
            output,
            format,
        } => {
            commands::run_export(transcript, output.clone(), format, settings)?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, &config_path)?;
        }
    }

    Ok(())
}
