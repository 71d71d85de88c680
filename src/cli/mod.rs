use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::constants::{DEFAULT_HOST, DEFAULT_PORT, ENV_HOST, ENV_PORT};

/// In-memory vector database with pluggable ANN indexes
#[derive(Parser, Debug)]
#[command(name = "vectordb")]
#[command(author, version = env!("CARGO_PKG_VERSION_FULL"), about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, global = true, default_value = "info")]
    pub loglevel: String,

    /// Suppress informational output (only show errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on (overrides VECTORDB_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind (overrides VECTORDB_HOST)
        #[arg(long)]
        host: Option<String>,
    },
}

pub async fn run(cancel_token: CancellationToken) -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host } => {
            let host = host
                .or_else(|| std::env::var(ENV_HOST).ok())
                .unwrap_or_else(|| DEFAULT_HOST.to_string());
            let port = port
                .or_else(|| std::env::var(ENV_PORT).ok().and_then(|p| p.parse().ok()))
                .unwrap_or(DEFAULT_PORT);
            crate::server::serve(&host, port, cancel_token).await
        }
    }
}
