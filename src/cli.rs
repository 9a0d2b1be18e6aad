use crate::config;
use crate::gateway::{self, AppState};
use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "classline", version, about = "WhatsApp webhook service for student self-service")]
struct Cli {
    /// Path to the config file (default: ~/.classline/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listen host from the config
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port from the config
    #[arg(long)]
    port: Option<u16>,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if config.server.bearer_token.is_empty() {
        bail!("server.bearerToken is not set (config file or CLASSLINE_TOKEN)");
    }
    if config.lms.base_url.is_empty() {
        bail!("lms.baseUrl is not set");
    }

    let state = AppState::from_config(&config);
    gateway::serve(&config.server.host, config.server.port, state).await
}
