//! Maintenance cost predictor - main entry point

use clap::Parser;
use maintenance_cost::cli::{cmd_demo, cmd_generate, cmd_predict, cmd_train, load_config, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maintenance_cost=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.workdir.as_deref())?;

    match cli.command {
        Some(Commands::Generate { rows, seed, output }) => {
            cmd_generate(&config, rows, seed, output.as_deref())?;
        }
        Some(Commands::Train) => {
            cmd_train(&config)?;
        }
        Some(Commands::Predict(args)) => {
            cmd_predict(&config, args)?;
        }
        None => {
            cmd_demo(&config)?;
        }
    }

    Ok(())
}
