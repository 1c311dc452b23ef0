//! # Core Type Definitions
//!
//! This module contains the data that flows through a Stepchain chain:
//! - The unit of transfer between stages (`Packet`)
//! - The per-stage lifecycle (`StageState`)
//! - Error types (`StepchainError`)
//!
//! ## Packet Guarantees
//!
//! A packet carries exactly one outcome (success xor failure).
//! The `paused` flag is orthogonal to the outcome and is carried unchanged
//! through every `then`/`catch` stage.

use thiserror::Error;

// =============================================================================
// PACKET
// =============================================================================

/// A Packet is the unit of data handed from one stage to the next.
///
/// `paused` marks that the *next* stage consuming this packet must first
/// receive one authorization from the pause gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet<T, E> {
    outcome: Result<T, E>,
    paused: bool,
}

impl<T, E> Packet<T, E> {
    /// Create a success packet.
    #[must_use]
    pub fn value(value: T) -> Self {
        Self {
            outcome: Ok(value),
            paused: false,
        }
    }

    /// Create a failure packet.
    #[must_use]
    pub fn error(error: E) -> Self {
        Self {
            outcome: Err(error),
            paused: false,
        }
    }

    /// Create a success packet whose consumer must wait for authorization.
    #[must_use]
    pub fn paused_value(value: T) -> Self {
        Self {
            outcome: Ok(value),
            paused: true,
        }
    }

    /// Build a packet from an outcome, keeping the given pause flag.
    #[must_use]
    pub fn from_outcome(outcome: Result<T, E>, paused: bool) -> Self {
        Self { outcome, paused }
    }

    /// Check if the next consumer must be authorized first.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Check if this packet carries a success value.
    #[must_use]
    pub fn is_value(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Same outcome, with the pause flag cleared.
    #[must_use]
    pub fn unpaused(self) -> Self {
        Self {
            outcome: self.outcome,
            paused: false,
        }
    }

    /// Split the packet into its outcome and pause flag.
    #[must_use]
    pub fn into_parts(self) -> (Result<T, E>, bool) {
        (self.outcome, self.paused)
    }

    /// Consume the packet, keeping only the outcome.
    #[must_use]
    pub fn into_outcome(self) -> Result<T, E> {
        self.outcome
    }
}

// =============================================================================
// STAGE STATE
// =============================================================================

/// Lifecycle of one attached stage.
///
/// `AwaitingAuthorization` only applies to stages whose inbound packet is
/// paused; every other stage starts in `Running`. `Emitted` is terminal and
/// reached exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageState {
    /// Inbound packet is paused; waiting for one gate authorization.
    AwaitingAuthorization,
    /// Applying the callback (or passing the outcome through).
    Running,
    /// Output packet handed to the next stage.
    Emitted,
}

impl StageState {
    /// Initial state for a stage given its inbound packet.
    #[must_use]
    pub fn initial(inbound_paused: bool) -> Self {
        if inbound_paused {
            StageState::AwaitingAuthorization
        } else {
            StageState::Running
        }
    }

    /// Get the state name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StageState::AwaitingAuthorization => "awaiting-authorization",
            StageState::Running => "running",
            StageState::Emitted => "emitted",
        }
    }
}

impl std::fmt::Display for StageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by Stepchain controller operations and tooling.
///
/// Chain failures are never reported here: they travel inside packets as the
/// caller's own error type. This enum covers misuse of the pause gate and
/// the ambient concerns of the binary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepchainError {
    /// More authorizations were requested than there are stages left to use them.
    #[error("Cannot issue {requested} authorization(s): only {available} stage(s) left to authorize")]
    Overshoot {
        /// Authorizations requested by the caller.
        requested: usize,
        /// Enlisted stages that do not hold an authorization yet.
        available: usize,
    },

    /// A configuration file could not be parsed or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

// =============================================================================
// TESTS
// =============================================================================
