mod config;
mod http;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use platform_obs::{ObsConfig, init_tracing};
use products_hr::JsonFileStore;
use tracing::info;

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "employee-server", version, about = "Employee directory over a JSON file")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Create the data file with an empty employee list.
    Init(InitCommand),
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, default_value_t = 3000)]
    port: u16,
    #[arg(long, value_name = "FILE", help = "Employee data file (overrides EMPLOYEES_FILE)")]
    data_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InitCommand {
    #[arg(long, value_name = "FILE", help = "Employee data file (overrides EMPLOYEES_FILE)")]
    data_file: Option<PathBuf>,
    #[arg(long, help = "Overwrite an existing data file")]
    force: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(ObsConfig::new("employee-server"))?;
    let cli = Cli::parse();
    let app_config = AppConfig::load()?;
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, app_config).await,
        Command::Init(cmd) => run_init(cmd, app_config),
    }
}

async fn run_server(cmd: ServeCommand, config: AppConfig) -> Result<()> {
    let config = Arc::new(config.with_data_file(cmd.data_file.clone()));
    let store = JsonFileStore::new(&config.employees_file);
    if !store.path().exists() {
        tracing::warn!(
            path = %store.path().display(),
            "employee data file missing; requests will fail until `init` is run"
        );
    }
    info!(path = %store.path().display(), "serving employees");
    let state = AppState {
        store: Arc::new(store),
        config,
    };
    http::serve((&cmd).into(), state).await
}

fn run_init(cmd: InitCommand, config: AppConfig) -> Result<()> {
    let config = config.with_data_file(cmd.data_file);
    let store = JsonFileStore::new(&config.employees_file);
    store
        .init(cmd.force)
        .with_context(|| format!("failed to initialize {}", store.path().display()))?;
    info!(path = %store.path().display(), "employee data file initialized");
    Ok(())
}
