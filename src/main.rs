use clap::{Parser, Subcommand};
use std::path::PathBuf;
use todo_mcp::Result;
use todo_mcp::commands::{init_config, serve_http, serve_mcp, show_config};
use todo_mcp::config::{Config, StorageBackend};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "todo-mcp")]
#[command(about = "A todo list backend exposed as an MCP server and a REST API")]
#[command(version)]
struct Cli {
    /// Storage backend, overriding the configuration file
    #[arg(long, global = true, value_enum)]
    backend: Option<StorageBackend>,

    /// Directory holding config.toml (and the todo file by default)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio
    Serve,
    /// Start the REST API server
    Http {
        /// Address to listen on
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
    /// Show or create the configuration file
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Write a configuration file with the current settings
        #[arg(long)]
        init: bool,
    },
}

/// Logs go to stderr; stdout carries protocol traffic.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => Config::config_dir()?,
    };
    let mut config = Config::load(&config_dir)?;
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }

    init_logging(&config);

    match cli.command {
        Commands::Serve => {
            serve_mcp(&config).await?;
        }
        Commands::Http { host, port } => {
            if let Some(host) = host {
                config.http.set_host(host)?;
            }
            if let Some(port) = port {
                config.http.set_port(port)?;
            }
            serve_http(&config).await?;
        }
        Commands::Config { show, init } => {
            if init {
                init_config(&config)?;
            }
            if show || !init {
                show_config(&config)?;
            }
        }
    }

    Ok(())
}
