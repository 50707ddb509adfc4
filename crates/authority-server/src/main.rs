//! authority-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `AUTHORITY_*` environment variables, opens the local index and serves the
//! lookup API over HTTP until interrupted.

use std::path::PathBuf;

use anyhow::Context as _;
use authority_server::{ServerConfig, Service, settings};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Authority record lookup server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(settings::environment())
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let service = Service::start(&server_cfg)
    .await
    .with_context(|| format!("failed to start with index at {:?}", server_cfg.index.path))?;

  let app = service.router();
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
      }
      tracing::info!("shutting down");
    })
    .await
    .context("server error")?;

  service.shutdown().await;
  Ok(())
}
