use anyhow::{Context, Result};
use clap::Parser;
use docparse_gateway::{
    api::{self, RouterOptions},
    config::Config,
    converter::DoclingCli,
    logging,
    parsing::ParsingService,
};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};

/// HTTP gateway converting PDFs and images to Markdown.
#[derive(Parser)]
#[command(name = "docparse-gateway", version, about)]
struct Cli {
    /// Bind address (overrides SERVER_HOST).
    #[arg(long)]
    host: Option<IpAddr>,
    /// Bind port (overrides SERVER_PORT).
    #[arg(long)]
    port: Option<u16>,
    /// Converter command line (overrides DOCPARSE_CONVERTER_COMMAND).
    #[arg(long)]
    converter: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load().context("failed to load configuration")?;
    logging::init_tracing(&config);

    if let Some(host) = cli.host {
        config.server_host = host;
    }
    if let Some(port) = cli.port {
        config.server_port = port;
    }
    if let Some(command) = cli.converter {
        config.converter_command = command.split_whitespace().map(str::to_string).collect();
    }
    tracing::debug!(
        converter = ?config.converter_command,
        ocr = config.ocr,
        table_structure = config.table_structure,
        timeout = ?config.conversion_timeout,
        max_concurrent = ?config.max_concurrent_conversions,
        max_upload_bytes = ?config.max_upload_bytes,
        "Loaded configuration"
    );

    let mut converter = DoclingCli::from_command(&config.converter_command)
        .context("converter command must not be empty")?;
    if let Some(dir) = &config.temp_dir {
        converter = converter.with_scratch_dir(dir);
    }
    tracing::info!(program = converter.program(), "Using docling converter");

    let service = Arc::new(ParsingService::from_config(&config, Arc::new(converter)));
    let app = api::create_router(service, &RouterOptions::from_config(&config));

    let listener = TcpListener::bind((config.server_host, config.server_port))
        .await
        .with_context(|| {
            format!(
                "failed to bind {}:{}",
                config.server_host, config.server_port
            )
        })?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
