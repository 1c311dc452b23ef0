//! # Stepchain CLI Module
//!
//! This module implements the CLI interface for Stepchain.
//!
//! ## Available Commands
//!
//! - `eager` - Resolve a value through `+1` then `*7`
//! - `recover` - Reject, recover with `catch`, continue with `then`
//! - `stepped` - Step a paused chain one stage at a time
//! - `allocate` - Authorize several stages at once (overshoot is rejected)
//! - `resume` - Step a paused chain manually, then let it run on its own

mod commands;

use crate::config::{DemoConfig, MAX_STAGES};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use stepchain_core::StepchainError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Stepchain - promise chains you can single-step
///
/// Builds eager and paused chains and shows how authorizations move a
/// paused chain forward one stage at a time.
#[derive(Parser, Debug)]
#[command(name = "stepchain")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (stage-level tracing)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a value through an eager chain
    Eager {
        /// Initial value
        #[arg(long, default_value = "2", allow_hyphen_values = true)]
        value: i64,
    },

    /// Reject, then recover with catch
    Recover {
        /// Error message carried by the rejection
        #[arg(short, long, default_value = "This is an error")]
        message: String,
    },

    /// Step a paused chain one stage at a time
    Stepped {
        /// Initial value
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        value: i64,

        /// Number of stages (defaults to the configured value)
        #[arg(short, long)]
        stages: Option<usize>,

        /// Pause between steps in milliseconds (defaults to the configured value)
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },

    /// Authorize several stages at once
    Allocate {
        /// Number of stages (defaults to the configured value)
        #[arg(short, long)]
        stages: Option<usize>,

        /// Authorizations to request
        #[arg(short = 'n', long)]
        count: usize,
    },

    /// Step manually, then let the chain run to completion
    Resume {
        /// Initial value
        #[arg(long, default_value = "100", allow_hyphen_values = true)]
        value: i64,

        /// Number of stages (defaults to the configured value)
        #[arg(short, long)]
        stages: Option<usize>,

        /// Manual steps issued before resuming
        #[arg(short = 'm', long, default_value = "1")]
        manual_steps: usize,
    },
}

/// Pick the stage count from the flag or the configuration.
fn resolve_stages(flag: Option<usize>, config: &DemoConfig) -> Result<usize, StepchainError> {
    let stages = flag.unwrap_or(config.stepping.stages);
    if stages == 0 || stages > MAX_STAGES {
        return Err(StepchainError::Config(format!(
            "stages must be between 1 and {}, got {}",
            MAX_STAGES, stages
        )));
    }
    Ok(stages)
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli, config: &DemoConfig) -> Result<(), DemoFault> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Eager { value }) => cmd_eager(value, json_mode).await,
        Some(Commands::Recover { message }) => cmd_recover(message, json_mode).await,
        Some(Commands::Stepped {
            value,
            stages,
            interval_ms,
        }) => {
            let stages = resolve_stages(stages, config)?;
            let interval =
                Duration::from_millis(interval_ms.unwrap_or(config.stepping.interval_ms));
            cmd_stepped(value, stages, interval, json_mode).await
        }
        Some(Commands::Allocate { stages, count }) => {
            let stages = resolve_stages(stages, config)?;
            cmd_allocate(stages, count, json_mode).await
        }
        Some(Commands::Resume {
            value,
            stages,
            manual_steps,
        }) => {
            let stages = resolve_stages(stages, config)?;
            cmd_resume(value, stages, manual_steps, json_mode).await
        }
        None => {
            // No subcommand - run the classic eager demo
            cmd_eager(2, json_mode).await
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
