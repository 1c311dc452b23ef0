//! # stepchain-core
//!
//! Deferred values with chained transformation and recovery - THE LOGIC.
//!
//! Two kinds of chain are provided:
//! - [`Promise`]: eager. Every attached stage runs as soon as its input arrives.
//! - [`PausedPromise`]: stepped. Every attached stage waits for one
//!   authorization from the lineage's [`PauseGate`] before it runs.
//!
//! ```no_run
//! use stepchain_core::{PausedPromise, Promise};
//!
//! # async fn demo() -> Result<(), stepchain_core::StepchainError> {
//! let answer = Promise::<i32, String>::resolve(2).then(|v| v + 1).then(|v| v * 7);
//! assert_eq!(answer.settle().await, Ok(21));
//!
//! let stepped = PausedPromise::<i32, String>::paused(0).then(|v| v + 1);
//! stepped.step()?;
//! assert_eq!(stepped.settle().await, Ok(1));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architectural Constraints
//!
//! - One Tokio task per attached stage; stages communicate only through
//!   single-use handoff cells
//! - The pause gate is the only state shared between stages
//! - Failures are data: nothing is raised while building or running a chain
//! - No cancellation: an unauthorized stage stays parked

// =============================================================================
// MODULES
// =============================================================================

pub mod channel;
pub mod compose;
pub mod gate;
pub mod paused;
pub mod promise;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Packet, StageState, StepchainError};

// =============================================================================
// RE-EXPORTS: Chains
// =============================================================================

pub use compose::{Callback, in_order, log_value};
pub use gate::{GateSnapshot, PauseGate};
pub use paused::PausedPromise;
pub use promise::{Promise, Rejecter, Resolver};
