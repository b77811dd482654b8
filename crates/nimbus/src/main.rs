//! # nimbus
//!
//! Weather tool server binary: loads settings, wires the credential
//! authority, the weather lookup and the dispatcher into the HTTP server, and
//! runs until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use nimbus_auth::{ApiKeyStore, CredentialAuthority};
use nimbus_rpc::{HandlerRegistry, RpcContext, ToolCatalog};
use nimbus_server::config::ServerConfig;
use nimbus_server::server::NimbusServer;
use nimbus_settings::NimbusSettings;
use nimbus_weather::OpenWeatherClient;

/// nimbus weather tool server.
#[derive(Parser, Debug)]
#[command(name = "nimbus", version, about = "Weather tool server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Settings file (default `~/.nimbus/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Log level or filter directive (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Load settings and apply the command-line overrides on top.
    fn load_settings(&self) -> Result<NimbusSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(nimbus_settings::loader::settings_path);
        let mut settings = nimbus_settings::loader::load_settings_from_path(&path)
            .context("Failed to load settings")?;

        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        Ok(settings)
    }
}

/// Build the server from validated settings.
fn build_server(settings: &NimbusSettings) -> Result<NimbusServer> {
    let authority = CredentialAuthority::new(&settings.auth.secret_key, Arc::new(ApiKeyStore::new()))
        .with_ttl(Duration::from_secs(settings.auth.token_ttl_secs));

    let lookup = OpenWeatherClient::from_settings(&settings.weather)
        .context("Failed to create weather client")?;
    let catalog = Arc::new(ToolCatalog::weather(Arc::new(lookup)));
    let handlers = Arc::new(HandlerRegistry::with_builtins());

    tracing::info!(
        tools = ?catalog.names(),
        request_types = ?handlers.types(),
        "dispatcher ready"
    );

    Ok(NimbusServer::new(
        ServerConfig::from_settings(settings),
        Arc::new(authority),
        handlers,
        RpcContext::new(catalog),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.load_settings()?;

    nimbus_core::logging::init_subscriber(&settings.logging.level, settings.logging.json);
    nimbus_settings::loader::validate_settings(&settings).context("Invalid settings")?;

    let server = build_server(&settings)?;
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;

    tracing::info!(
        version = nimbus_core::constants::VERSION,
        "nimbus listening on http://{addr}"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    if !server.shutdown().graceful_shutdown(vec![handle], None).await {
        tracing::warn!("server did not drain in time");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
