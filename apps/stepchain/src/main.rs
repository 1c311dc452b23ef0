//! # Stepchain - Stepped Promise Chains
//!
//! The demo binary for the Stepchain promise engine.
//!
//! This application provides:
//! - CLI commands that build eager and paused chains
//! - Manual stepping, bulk allocation and resumption of paused chains
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            apps/stepchain (THE BINARY)        │
//! │                                               │
//! │   ┌─────────────┐        ┌───────────────┐    │
//! │   │    CLI      │        │    Config     │    │
//! │   │   (clap)    │        │    (toml)     │    │
//! │   └──────┬──────┘        └───────┬───────┘    │
//! │          └───────────┬───────────┘            │
//! │                      ▼                        │
//! │             ┌────────────────┐                │
//! │             │ stepchain-core │                │
//! │             │  (THE LOGIC)   │                │
//! │             └────────────────┘                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! stepchain eager --value 2
//! stepchain stepped --value 0 --stages 3 --interval-ms 250
//! stepchain allocate --stages 3 --count 5
//! stepchain --json-mode resume --value 100 --manual-steps 1
//! ```

use clap::Parser;
use stepchain::cli;
use stepchain::config::{DemoConfig, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Load configuration before logging so the file can pick the format.
    let config = DemoConfig::load(cli.config.as_deref());
    let log_format = match &config {
        Ok(config) => config.log_format(),
        Err(_) => DemoConfig::default().log_format(),
    };
    init_tracing(log_format, cli.verbose);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli, &config).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing. `RUST_LOG` wins over the verbosity flag.
fn init_tracing(format: LogFormat, verbose: bool) {
    let default_filter = if verbose {
        "stepchain=debug,stepchain_core=trace"
    } else {
        "stepchain=info,stepchain_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

/// Print the Stepchain startup banner.
fn print_banner() {
    println!(
        r#"
  ┌─┐┌┬┐┌─┐┌─┐┌─┐┬ ┬┌─┐┬┌┐┌
  └─┐ │ ├┤ ├─┘│  ├─┤├─┤││││
  └─┘ ┴ └─┘┴  └─┘┴ ┴┴ ┴┴┘└┘

  Stepped Promise Chains v{}

  Resolve • Step • Resume
"#,
        env!("CARGO_PKG_VERSION")
    );
}
