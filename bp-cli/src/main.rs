//! Bonus Points CLI Entry Point
//!
//! Configuration is loaded from environment variables (via .env file).
//! Command-line arguments override environment variables.
//!
//! Usage:
//!   bp award      - Award points to a player
//!   bp resync     - Recompute a player's derived rows
//!   bp balance    - Show a player's balances
//!   bp event      - Preview, commit and revert event spend
//!   bp credit     - Store credit ledger
//!   bp audit      - Read the audit log

use bp_cli::{handler, Cli};
use bp_core::LogLevel;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_level());

    if let Err(e) = handler::run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// RUST_LOG wins over the command-line level
fn init_logging(level: LogLevel) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.filter_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
