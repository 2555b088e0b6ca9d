//! Studyflow CLI entry point.

use anyhow::Result;
use clap::Parser;
use studyflow::cli::commands::{self, CycleArgs};
use studyflow::cli::{Cli, Commands};
use studyflow::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("studyflow={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&Settings::expand_path(path)))?,
        None => Settings::load()?,
    };

    std::fs::create_dir_all(settings.data_dir())?;

    match cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, port, settings).await?;
        }

        Commands::Run { request } => {
            commands::run_request(&request, settings).await?;
        }

        Commands::Questions {
            subject,
            topic,
            count,
            difficulty,
        } => {
            commands::run_questions(&subject, &topic, count, difficulty.as_deref(), settings)
                .await?;
        }

        Commands::Cycle {
            subject,
            topic,
            total,
            correct,
            weak_topics,
            user,
            json,
        } => {
            let args = CycleArgs {
                subject,
                topic,
                total,
                correct,
                weak_topics,
                user,
                json,
            };
            commands::run_cycle(args, settings).await?;
        }

        Commands::History { user_id, limit } => {
            commands::run_history(&user_id, limit, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, cli.config.as_deref(), settings)?;
        }
    }

    Ok(())
}
