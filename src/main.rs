//! Fallback client - fetch API resources with a degraded-mode cache
//!
//! Performs a signed GET through the fallback cache and writes the body to
//! stdout. The response source and status go to stderr.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fallback_client::cli::{Cli, Command};
use fallback_client::{ApiClient, CachedApiClient, FileStore};

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let params = cli.command.query_params()?;
    let authenticator = cli.command.authenticator();

    let store = match &cli.cache_dir {
        Some(dir) => FileStore::with_dir(dir.clone()),
        None => FileStore::new().ok_or("could not determine a cache directory; pass --cache-dir")?,
    };

    let client = ApiClient::new(cli.client_config())?;
    let cached = CachedApiClient::new(client, store, cli.fallback_config());

    let Command::Get { path, .. } = &cli.command;
    let response = cached.get(path, &params, authenticator.as_ref()).await?;

    eprintln!("{} {}", response.source(), response.status_code());
    io::stdout().write_all(response.content())?;

    if response.is_failure() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fallback_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
