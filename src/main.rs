mod cli;
mod constants;
mod embed;
mod error;
mod index;
mod math;
mod model;
mod search;
mod server;
mod store;

use anyhow::Result;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse loglevel/quiet from raw args (needed before tracing init)
    let args: Vec<String> = std::env::args().collect();
    let is_quiet = args.iter().any(|a| a == "-q" || a == "--quiet");
    let loglevel = args
        .iter()
        .position(|a| a == "-l" || a == "--loglevel")
        .and_then(|pos| args.get(pos + 1))
        .cloned()
        .unwrap_or_else(|| "info".to_string());

    // Create cancellation token for graceful server shutdown
    let cancel_token = CancellationToken::new();
    let cancel_clone = cancel_token.clone();

    // First press: graceful shutdown via CancellationToken. Second press:
    // force exit.
    ctrlc::set_handler(move || {
        if constants::SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            eprintln!("\n⚠️  Force shutdown!");
            std::process::exit(130);
        }
        eprintln!("\n🛑 Shutting down gracefully... (press Ctrl-C again to force)");
        constants::SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
        cancel_clone.cancel();
    })
    .expect("Failed to set CTRL-C handler");

    if !is_quiet {
        // IMPORTANT: Use stderr — stdout is reserved for program output
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| format!("vectordb={loglevel}").into()),
            )
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();

        info!(
            "Starting vectordb v{} (loglevel: {})",
            env!("CARGO_PKG_VERSION_FULL"),
            loglevel
        );
    }

    cli::run(cancel_token).await
}
