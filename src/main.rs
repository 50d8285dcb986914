//! Obesity classifier - Main Entry Point

use clap::Parser;
use obesity_stack::cli::{cmd_info, cmd_predict, cmd_serve, cmd_train, Cli, Commands, TrainArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "obesity_stack=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { data, output, config, candidates, seed, sample, report } => {
            let args = TrainArgs {
                data: &data,
                output: &output,
                config: config.as_deref(),
                candidates: candidates.as_deref(),
                seed,
                sample,
                report: report.as_deref(),
            };
            // Training is CPU bound; keep it off the async workers
            tokio::task::block_in_place(|| cmd_train(args))?;
        }
        Commands::Predict { model, input } => {
            cmd_predict(&model, &input)?;
        }
        Commands::Serve { host, port, model } => {
            cmd_serve(host, port, model).await?;
        }
        Commands::Info { data, model } => {
            cmd_info(data.as_deref(), model.as_deref())?;
        }
    }

    Ok(())
}
