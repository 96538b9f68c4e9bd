use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use grpc_bootstrap::config::{default_config_path, AppConfig, ConfigLoader, ENV_PREFIX};
use grpc_bootstrap::lifecycle::signals::shutdown_signal;
use grpc_bootstrap::observability::{logging, metrics, TracingEventLogger};
use grpc_bootstrap::{App, Error};

#[derive(Parser)]
#[command(name = "grpc-bootstrap")]
#[command(about = "gRPC echo server with graceful lifecycle management", long_about = None)]
struct Cli {
    /// Config file (YAML or TOML). Defaults to config/<binary>/config.yaml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not fill in a default host and port.
    #[arg(long)]
    strict: bool,

    /// Prefix for environment overrides.
    #[arg(long, default_value = ENV_PREFIX)]
    env_prefix: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loader = ConfigLoader::new(cli.env_prefix).defaults(!cli.strict);
    let loader = match cli.config {
        Some(path) => loader.file(path),
        None => loader.optional_file(default_config_path()),
    };

    // Logging is configured from the file, so these go to stderr.
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = logging::init(&config.app.logging) {
        eprintln!("logging error: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "grpc-bootstrap starting");

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) if e.is_clean_exit() => {
            tracing::warn!(error = %e, "Shutdown complete, drain was cut short");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Error> {
    let server = &config.app.server;
    tracing::info!(
        endpoint = %server.endpoint(),
        shutdown_timeout_secs = server.shutdown_timeout_secs,
        "Configuration loaded"
    );

    // Validation guarantees the address parses.
    if let Some(addr) = config
        .app
        .observability
        .metrics_address
        .as_deref()
        .and_then(|addr| addr.parse().ok())
    {
        metrics::init_metrics(addr)?;
    }

    let app = App::bootstrap(config, Arc::new(TracingEventLogger))?;
    app.run(shutdown_signal()).await
}
