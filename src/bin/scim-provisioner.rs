//! # SCIM Provisioner
//!
//! Runs the multi-tenant SCIM server over the bundled in-memory directory.
//!
//! ## Usage
//!
//! ```bash
//! scim-provisioner --config scim.json
//! SCIM_LISTEN=127.0.0.1:9000 scim-provisioner --config scim.json
//! ```
//!
//! Logging goes through `env_logger`; set `RUST_LOG=debug` for request-level
//! detail.

use clap::Parser;
use scim_provisioner::auth::ValidatorRegistry;
use scim_provisioner::config::ServerConfig;
use scim_provisioner::directory::InMemoryDirectory;
use scim_provisioner::issuer::TokenIssuer;
use scim_provisioner::multi_tenant::StaticTenantResolver;
use scim_provisioner::schema::SchemaRegistry;
use scim_provisioner::server::{AppState, router};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// Multi-tenant SCIM 2.0 provisioning server
#[derive(Parser, Debug)]
#[command(name = "scim-provisioner", version, about)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "SCIM_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration file
    #[arg(short, long, env = "SCIM_LISTEN")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        log::error!("{}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => {
            log::warn!("No configuration file given, starting without tenants");
            ServerConfig::default()
        }
    };
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }

    let directory = Arc::new(InMemoryDirectory::new());
    for provider in &config.identity_providers {
        directory.add_identity_provider(provider.clone()).await;
    }

    let resolver = Arc::new(StaticTenantResolver::new(
        config.tenants.clone(),
        Arc::clone(&directory),
    )?);
    let registry = Arc::new(SchemaRegistry::with_embedded_schemas()?);
    let validators = Arc::new(ValidatorRegistry::new(config.validator_cache_capacity));

    let mut state = AppState::new(resolver, registry, validators, &config.base_url);
    if let Some(settings) = config.issuer.clone() {
        let issuer = tokio::task::spawn_blocking(move || TokenIssuer::generate(settings)).await??;
        state = state.with_issuer(Arc::new(issuer));
    }

    log::info!("SCIM provisioner starting");
    log::info!("  Listen:   {}", config.listen);
    log::info!("  Base URL: {}", config.base_url);
    log::info!("  Tenants:  {}", config.tenants.len());
    log::info!(
        "  Issuer:   {}",
        if state.issuer.is_some() { "enabled" } else { "disabled" }
    );

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
