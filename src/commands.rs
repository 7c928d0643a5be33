use anyhow::{Context, Result};
use tracing::info;

use crate::api;
use crate::config::Config;
use crate::mcp::McpServer;
use crate::storage::open_store;

/// Serve the MCP protocol on stdin/stdout until the client closes stdin
#[inline]
pub async fn serve_mcp(config: &Config) -> Result<()> {
    info!(
        "Starting todo MCP server v{} (protocol {})",
        env!("CARGO_PKG_VERSION"),
        crate::mcp::protocol::PROTOCOL_VERSION
    );

    let store = open_store(&config.resolved_storage());
    let server = McpServer::new(store);

    server
        .serve_stdio()
        .await
        .context("MCP server terminated with an error")
}

/// Serve the REST API on the configured address until ctrl-c
#[inline]
pub async fn serve_http(config: &Config) -> Result<()> {
    let addr = config
        .http
        .socket_addr()
        .context("Invalid HTTP listen address")?;

    let store = open_store(&config.resolved_storage());
    api::serve_http(addr, store).await
}

/// Print the effective configuration
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    let config_path = config.config_file_path();
    let content = toml::to_string_pretty(config).context("Failed to serialize config to TOML")?;

    println!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        println!("(not found, showing defaults)");
    }
    println!();
    println!("{}", content.trim_end());
    println!();
    println!("Todo file: {}", config.todo_file_path().display());

    Ok(())
}

/// Write the effective configuration unless a config file already exists
#[inline]
pub fn init_config(config: &Config) -> Result<()> {
    let config_path = config.config_file_path();
    if config_path.exists() {
        println!(
            "Configuration file already exists: {}",
            config_path.display()
        );
        return Ok(());
    }

    config.save()?;
    info!("Wrote configuration to {}", config_path.display());
    println!("Created configuration file: {}", config_path.display());

    Ok(())
}
