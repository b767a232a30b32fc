use clap::Parser;
use healthrisk::app::App;
use healthrisk::cli::{Args, Command};
use healthrisk::config::Config;
use healthrisk::logging::setup_logging;
use healthrisk::model::train::{TrainOptions, train};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config and setup logging first so startup logs are never silently dropped
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    let command = args.command.unwrap_or_default();
    let result = match command {
        Command::Serve => serve(config).await,
        Command::Train(train_args) => {
            let options = TrainOptions {
                dataset: train_args.dataset.clone(),
                output: train_args
                    .output
                    .clone()
                    .unwrap_or_else(|| config.model_path.clone()),
                params: train_args.forest_params(),
                test_fraction: train_args.test_fraction,
            };
            tokio::task::spawn_blocking(move || train(&options))
                .await
                .map_err(anyhow::Error::from)
                .and_then(|report| report)
                .map(|report| println!("{report}"))
        }
        Command::Users => healthrisk::app::print_users(&config).await,
        Command::Predictions => healthrisk::app::print_predictions(&config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting healthrisk"
    );

    let app = App::new(config).await?;
    app.run().await
}
