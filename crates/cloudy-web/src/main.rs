use std::path::PathBuf;

use clap::Parser;
use cloudy_core::config::{CloudyConfig, StorageConfig};
use cloudy_storage::Storage;
use cloudy_web::ServerConfig;
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "cloudy-serve")]
#[command(about = "Serve objects of a local cloudy storage over HTTP")]
struct Cli {
    /// Path to the configuration file (TOML). Defaults to ~/.cloudy/cloudy.toml
    #[arg(long, short, env = "CLOUDY_CONFIG")]
    config: Option<PathBuf>,

    /// Override `[server] listen_addr`
    #[arg(long)]
    listen: Option<String>,
}

/// Storage settings plus the `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServeConfig {
    storage: StorageConfig,
    #[serde(default)]
    server: ServerConfig,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<ServeConfig> {
    let path = match path {
        Some(p) => p,
        None => CloudyConfig::default_path(&CloudyConfig::default_base_dir()?),
    };

    if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        return Ok(toml::from_str(&content)?);
    }

    // No file: environment variables alone may describe the storage.
    if std::env::var("CLOUDY_STORAGE_PROVIDER").is_ok() {
        tracing::info!(path = %path.display(), "no config file, using environment");
        return Ok(ServeConfig {
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
        });
    }

    Err(cloudy_core::CloudyError::ConfigNotFound(path.display().to_string()).into())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cloudy=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config)?;
    config.storage.apply_env();
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }

    let storage = Storage::initialize(config.storage).await?;
    cloudy_web::start_file_server(config.server, storage).await
}
