//! # Paused Promise
//!
//! A promise lineage whose stages only advance when an external controller
//! authorizes them through the lineage's [`PauseGate`].
//!
//! ## Stepping Model
//!
//! - `paused(v)` creates the root packet (marked paused) and a new gate.
//! - Every `then`/`catch` enlists one stage with the gate at attach time.
//! - A stage that receives a paused packet parks until it consumes exactly one
//!   authorization, then runs and emits a packet that is still paused.
//! - Every enlisted stage consumes one authorization, including a stage whose
//!   callback is skipped by routing (one step, one stage).
//!
//! Stages run strictly in sequence, so at most one stage of a lineage is ever
//! parked on the gate and an authorization is never ambiguous.
//!
//! ## Controller Operations
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | `step` | one authorization |
//! | `allocate(n)` | `n` authorizations, rejected if more than the stages left |
//! | `deallocate` | next stage runs without a step, on a fresh gate |
//! | `resume` | drive the remaining stages and return an eager [`Promise`] |

use crate::channel::{StageReceiver, stage_channel};
use crate::gate::{GateSnapshot, PauseGate};
use crate::promise::{Promise, spawn_stage};
use crate::types::{Packet, StepchainError};

/// A promise lineage advanced one stage per authorization.
pub struct PausedPromise<T, E> {
    receiver: StageReceiver<Packet<T, E>>,
    gate: PauseGate,
}

impl<T, E> PausedPromise<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a paused root holding `value`, with a new gate.
    #[must_use]
    pub fn paused(value: T) -> Self {
        let (tx, rx) = stage_channel();
        tx.send(Packet::paused_value(value));
        Self {
            receiver: rx,
            gate: PauseGate::new(),
        }
    }

    /// Clone the controller handle for this lineage.
    ///
    /// The handle stays valid after `then`/`catch` consume this promise, so a
    /// chain can be built first and stepped afterwards.
    #[must_use]
    pub fn gate(&self) -> PauseGate {
        self.gate.clone()
    }

    /// Read the lineage's gate counters.
    #[must_use]
    pub fn snapshot(&self) -> GateSnapshot {
        self.gate.snapshot()
    }

    /// Attach a gated stage transforming the success value.
    #[must_use]
    pub fn then<U, F>(self, callback: F) -> PausedPromise<U, E>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let ticket = self.gate.enlist();
        PausedPromise {
            receiver: spawn_stage(self.receiver, Some(ticket), move |outcome| {
                outcome.map(callback)
            }),
            gate: self.gate,
        }
    }

    /// Attach a gated stage recovering from a failure.
    #[must_use]
    pub fn catch<F>(self, callback: F) -> PausedPromise<T, E>
    where
        F: FnOnce(E) -> T + Send + 'static,
    {
        let ticket = self.gate.enlist();
        PausedPromise {
            receiver: spawn_stage(self.receiver, Some(ticket), move |outcome| {
                Ok(outcome.unwrap_or_else(callback))
            }),
            gate: self.gate,
        }
    }

    /// Authorize the next parked stage. Returns immediately.
    pub fn step(&self) -> Result<&Self, StepchainError> {
        self.gate.step()?;
        Ok(self)
    }

    /// Authorize the next `n` stages.
    ///
    /// `n` must not exceed the stages still lacking an authorization; an
    /// overshoot is rejected and issues nothing.
    pub fn allocate(&self, n: usize) -> Result<&Self, StepchainError> {
        self.gate.allocate(n)?;
        Ok(self)
    }

    /// Detach the next packet from this gate.
    ///
    /// The packet is forwarded unmodified to a fresh gate holding one bypass:
    /// the next attached stage runs without a step, later stages are gated by
    /// the fresh gate. Stages already attached upstream keep their own gate.
    #[must_use]
    pub fn deallocate(self) -> PausedPromise<T, E> {
        let gate = PauseGate::with_bypass(1);
        tracing::debug!(from = self.gate.id(), to = gate.id(), "packet detached from gate");
        PausedPromise {
            receiver: spawn_stage(self.receiver, None, |outcome| outcome),
            gate,
        }
    }

    /// Let the lineage run to completion on its own.
    ///
    /// A driver task issues one authorization at a time and waits for it to be
    /// consumed before issuing the next, racing that against the arrival of
    /// the final packet. The returned promise holds the final outcome.
    ///
    /// Only this handle's gate is driven. On a handle returned by
    /// [`deallocate`](Self::deallocate), stages attached before the detach stay
    /// on the previous gate, so `paused(1).then(f).deallocate().resume()`
    /// never settles unless the previous gate is stepped separately.
    #[must_use]
    pub fn resume(self) -> Promise<T, E> {
        let (tx, rx) = stage_channel();
        let gate = self.gate;
        let tail = self.receiver.recv();

        tokio::spawn(async move {
            tokio::pin!(tail);
            let mut driven = 0usize;
            loop {
                tokio::select! {
                    biased;
                    packet = &mut tail => {
                        tracing::debug!(gate = gate.id(), driven, "lineage resumed to completion");
                        tx.send(packet.unpaused());
                        break;
                    }
                    () = gate.advance() => {
                        driven += 1;
                    }
                }
            }
        });

        Promise::from_receiver(rx)
    }

    /// Check whether the final packet is available without waiting.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.receiver.is_ready()
    }

    /// Wait for the outcome of the last attached stage.
    ///
    /// Never returns if the remaining stages are not authorized.
    pub async fn settle(self) -> Result<T, E> {
        self.receiver.recv().await.into_outcome()
    }
}

impl<T, E> std::fmt::Debug for PausedPromise<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PausedPromise")
            .field("settled", &self.receiver.is_ready())
            .field("gate", &self.gate)
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
