//! # Demo Configuration
//!
//! TOML configuration for the Stepchain CLI.
//!
//! ## Resolution Order
//!
//! 1. `--config <path>` on the command line
//! 2. `STEPCHAIN_CONFIG` environment variable
//! 3. Built-in defaults
//!
//! An explicitly named file that cannot be read or parsed is an error; a
//! missing default is not. `STEPCHAIN_LOG_FORMAT` overrides `[logging].format`.
//!
//! ```toml
//! [stepping]
//! interval_ms = 250
//! stages = 3
//!
//! [logging]
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use stepchain_core::StepchainError;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "STEPCHAIN_CONFIG";

/// Environment variable overriding the log format.
pub const LOG_FORMAT_ENV: &str = "STEPCHAIN_LOG_FORMAT";

/// Upper bound on stages a demo chain may attach.
pub const MAX_STAGES: usize = 1024;

// =============================================================================
// CONFIG STRUCTURE
// =============================================================================

/// Top-level demo configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    /// Defaults for stepped chains.
    pub stepping: SteppingConfig,
    /// Logging output.
    pub logging: LoggingConfig,
}

/// Defaults for the `stepped`, `allocate` and `resume` commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SteppingConfig {
    /// Pause between manual steps, in milliseconds.
    pub interval_ms: u64,
    /// Number of stages attached to a demo chain.
    pub stages: usize,
}

impl Default for SteppingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 200,
            stages: 3,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Output format of the tracing subscriber.
    pub format: LogFormat,
}

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parse a format name; anything but `json` is text.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl DemoConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, StepchainError> {
        let config: Self =
            toml::from_str(content).map_err(|e| StepchainError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, then `STEPCHAIN_CONFIG`, then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, StepchainError> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        match path {
            Some(path) => Self::load_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load a specific file.
    pub fn load_file(path: &Path) -> Result<Self, StepchainError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StepchainError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Reject values the demo commands cannot run with.
    pub fn validate(&self) -> Result<(), StepchainError> {
        let stages = self.stepping.stages;
        if stages == 0 || stages > MAX_STAGES {
            return Err(StepchainError::Config(format!(
                "stepping.stages must be between 1 and {}, got {}",
                MAX_STAGES, stages
            )));
        }
        Ok(())
    }

    /// Effective log format: `STEPCHAIN_LOG_FORMAT` wins over the file.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        std::env::var(LOG_FORMAT_ENV)
            .map(|name| LogFormat::from_name(&name))
            .unwrap_or(self.logging.format)
    }
}

// =============================================================================
// TESTS
// =============================================================================
