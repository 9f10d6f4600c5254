use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rune::config::{Config, ConfigError};
use rune::dispatch::Dispatcher;
use rune::gateway::{GatewayClient, WsConnector};
use rune::rest::{DiscordApi, RestClient};
use rune::runtime::Runtime;
use rune::server::{self, AppState};

#[derive(Parser)]
#[command(name = "rune", version, about = "User-account chat client")]
struct Cli {
    /// Path to the JSON config file.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Override the control API bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the control API port.
    #[arg(long)]
    port: Option<u16>,

    /// Do not start the control API.
    #[arg(long)]
    no_api: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Exiting");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn load_config(path: &Path) -> Result<Config> {
    let config = match Config::load(path).await {
        Ok(config) => config,
        Err(ConfigError::NotFound(_)) => {
            Config::template()
                .save(path)
                .await
                .with_context(|| format!("writing template config to {}", path.display()))?;
            anyhow::bail!(
                "config file {} was missing; a template was written, fill in the token and restart",
                path.display()
            );
        }
        Err(e) => return Err(e).with_context(|| format!("loading {}", path.display())),
    };
    config.validate()?;
    if config.owner_id.is_empty() {
        warn!("owner_id is empty; no commands will run");
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let started_at = Utc::now();
    let mut config = load_config(&cli.config).await?;
    if let Some(host) = cli.host {
        config.api.host = host;
    }
    if let Some(port) = cli.port {
        config.api.port = port;
    }
    let api_config = config.api.clone();
    info!(
        config = %cli.config.display(),
        prefix = %config.prefix,
        auto_response = config.auto_response_enabled,
        "Configuration loaded"
    );

    let rest: Arc<dyn DiscordApi> = Arc::new(
        RestClient::new(config.token.clone()).context("building REST client")?,
    );
    let runtime = Arc::new(Runtime::new(
        cli.config.clone(),
        config,
        rest.clone(),
        started_at,
    ));
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let server_task = if cli.no_api {
        None
    } else {
        let addr = format!("{}:{}", api_config.host, api_config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding control API to {addr}"))?;
        let app = server::build_app(
            AppState {
                runtime: runtime.clone(),
            },
            api_config.request_timeout_seconds,
        );
        Some(tokio::spawn(server::serve(listener, app, cancel.clone())))
    };

    let client = GatewayClient::new(
        runtime.clone(),
        Arc::new(WsConnector::new(rest)),
        Arc::new(Dispatcher::new(runtime.clone())),
        cancel.clone(),
    );
    let result = client.run().await;

    // Whatever ended the gateway loop, take the server down with it.
    cancel.cancel();
    if let Some(task) = server_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Control API exited with an error"),
            Err(e) => warn!(error = %e, "Control API task failed"),
        }
    }

    result.context("gateway client stopped")?;
    info!("Shutdown complete");
    Ok(())
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
        info!("Shutdown signal received");
        cancel.cancel();
    });
}
