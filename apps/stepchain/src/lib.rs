//! # Stepchain
//!
//! Library half of the Stepchain demo binary: the CLI definition and its
//! commands, plus TOML configuration. `main.rs` wires them to a Tokio runtime
//! and a tracing subscriber.

pub mod cli;
pub mod config;
