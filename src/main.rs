//! Satisfaction Serve - Main Entry Point
//!
//! Serves a pre-trained satisfaction classifier over HTTP, with offline
//! scoring and data preparation subcommands.

use clap::Parser;
use satisfaction_serve::cli::{cmd_predict, cmd_prepare, cmd_schema, cmd_serve, Cli, Commands};
use satisfaction_serve::dataset::SplitConfig;
use satisfaction_serve::server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "satisfaction_serve=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { host, port, model }) => {
            cmd_serve(&host, port, &model).await?;
        }
        Some(Commands::Schema { model }) => {
            cmd_schema(&model)?;
        }
        Some(Commands::Predict { model, data, output }) => {
            cmd_predict(&model, &data, output.as_deref())?;
        }
        Some(Commands::Prepare {
            data,
            target,
            out,
            test_size,
            seed,
            missing,
            drop_first,
        }) => {
            let split = SplitConfig::new(test_size, seed);
            cmd_prepare(&data, &target, &out, &split, missing, drop_first)?;
        }
        None => {
            // Default: serve with environment configuration
            let config = ServerConfig::from_env();
            cmd_serve(&config.host, config.port, &config.model_path).await?;
        }
    }

    Ok(())
}
