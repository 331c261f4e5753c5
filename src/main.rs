#![allow(non_snake_case)]

use std::env;
use std::process::ExitCode;

use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use workspaceScheduler::cli;
use workspaceScheduler::config::{AppConfig, RunMode, Settings};
use workspaceScheduler::runtime;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(error = %err, "ignoring config file");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    };

    let settings = match Settings::load(|key| config.lookup(key)) {
        Ok(settings) => settings,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match settings.run_mode {
        RunMode::Api => runtime::run_api(settings).await,
        RunMode::Cli => cli::cli(settings).await,
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "scheduler stopped");
            ExitCode::FAILURE
        }
    }
}
