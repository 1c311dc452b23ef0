//! # Pause Gate
//!
//! The chain-wide authorization counter shared by every stage derived from one
//! `PausedPromise::paused` root.
//!
//! ## Accounting
//!
//! | Counter | Meaning |
//! |---------|---------|
//! | `enlisted` | stages attached to the lineage that have not consumed an authorization |
//! | `permits` | authorizations issued and not yet consumed |
//! | `waiting` | stages currently parked on the gate |
//! | `bypass` | one-shot pre-authorizations (granted by `deallocate`) |
//!
//! `permits <= enlisted` always holds: `allocate` refuses to issue an
//! authorization that no stage could ever consume. A surplus authorization
//! therefore never exists, and no sender is ever left parked.

use crate::types::StepchainError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

static NEXT_GATE_ID: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// GATE STATE
// =============================================================================

#[derive(Debug, Default)]
struct GateState {
    enlisted: usize,
    permits: usize,
    waiting: usize,
    bypass: usize,
    issued: u64,
    consumed: u64,
    /// Permits withdrawn because their stage went away unconsumed.
    revoked: u64,
}

impl GateState {
    fn available(&self) -> usize {
        self.enlisted.saturating_sub(self.permits)
    }
}

struct GateInner {
    id: u64,
    state: Mutex<GateState>,
    permit_issued: Notify,
    permit_consumed: Notify,
}

/// Point-in-time view of a gate's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSnapshot {
    /// Stages attached and not yet authorized-and-consumed.
    pub enlisted: usize,
    /// Authorizations issued but not consumed yet.
    pub permits: usize,
    /// Stages currently parked waiting for an authorization.
    pub waiting: usize,
    /// Stages that will be admitted without an authorization.
    pub bypass: usize,
    /// Total authorizations issued over the gate's lifetime.
    pub issued: u64,
    /// Total authorizations consumed over the gate's lifetime.
    pub consumed: u64,
}

impl GateSnapshot {
    /// Stages that can still receive an authorization.
    #[must_use]
    pub fn available(&self) -> usize {
        self.enlisted.saturating_sub(self.permits)
    }
}

// =============================================================================
// PAUSE GATE
// =============================================================================

/// Controller handle over a paused lineage.
///
/// Cloning the handle shares the same gate; every stage of the lineage and
/// every clone observe the same counters.
#[derive(Clone)]
pub struct PauseGate {
    inner: Arc<GateInner>,
}

impl PauseGate {
    /// Create a gate with no enlisted stages.
    #[must_use]
    pub fn new() -> Self {
        Self::with_bypass(0)
    }

    /// Create a gate whose next `bypass` enlisted stages are admitted freely.
    #[must_use]
    pub(crate) fn with_bypass(bypass: usize) -> Self {
        Self {
            inner: Arc::new(GateInner {
                id: NEXT_GATE_ID.fetch_add(1, Ordering::Relaxed),
                state: Mutex::new(GateState {
                    bypass,
                    ..GateState::default()
                }),
                permit_issued: Notify::new(),
                permit_consumed: Notify::new(),
            }),
        }
    }

    /// Process-unique identifier, used in log output.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue exactly one authorization. Returns immediately.
    pub fn step(&self) -> Result<&Self, StepchainError> {
        self.allocate(1)
    }

    /// Issue `n` authorizations at once.
    ///
    /// Fails with [`StepchainError::Overshoot`] when `n` exceeds the number of
    /// enlisted stages that do not hold an authorization yet. Nothing is
    /// issued on failure.
    pub fn allocate(&self, n: usize) -> Result<&Self, StepchainError> {
        let mut state = self.lock();
        let available = state.available();
        if n > available {
            tracing::debug!(gate = self.id(), requested = n, available, "authorization rejected");
            return Err(StepchainError::Overshoot {
                requested: n,
                available,
            });
        }
        if n == 0 {
            return Ok(self);
        }
        state.permits += n;
        state.issued = state.issued.saturating_add(n as u64);
        drop(state);

        tracing::debug!(gate = self.id(), issued = n, "authorizations issued");
        self.inner.permit_issued.notify_waiters();
        Ok(self)
    }

    /// Stages that can still receive an authorization.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.lock().available()
    }

    /// Read the gate's counters.
    #[must_use]
    pub fn snapshot(&self) -> GateSnapshot {
        let state = self.lock();
        GateSnapshot {
            enlisted: state.enlisted,
            permits: state.permits,
            waiting: state.waiting,
            bypass: state.bypass,
            issued: state.issued,
            consumed: state.consumed,
        }
    }

    /// Register one stage with the gate.
    pub(crate) fn enlist(&self) -> Ticket {
        let mut state = self.lock();
        let admission = if state.bypass > 0 {
            state.bypass -= 1;
            Admission::Bypassed
        } else {
            state.enlisted += 1;
            Admission::Gated
        };
        drop(state);

        tracing::trace!(gate = self.id(), ?admission, "stage enlisted");
        Ticket {
            gate: self.clone(),
            admission,
            parked: false,
            settled: false,
        }
    }

    /// Issue one authorization and wait until a stage has consumed it.
    ///
    /// Pends forever when every enlisted stage already holds an authorization;
    /// the caller races this against the chain's completion.
    pub(crate) async fn advance(&self) {
        let target = {
            let mut state = self.lock();
            if state.available() == 0 {
                None
            } else {
                state.permits += 1;
                state.issued = state.issued.saturating_add(1);
                Some(state.issued)
            }
        };
        let Some(target) = target else {
            return std::future::pending().await;
        };
        self.inner.permit_issued.notify_waiters();

        loop {
            let notified = self.inner.permit_consumed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let state = self.lock();
                if state.consumed.saturating_add(state.revoked) >= target {
                    return;
                }
            }
            notified.await;
        }
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PauseGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PauseGate")
            .field("id", &self.id())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

// =============================================================================
// TICKET
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Must consume one authorization.
    Gated,
    /// Admitted without an authorization.
    Bypassed,
}

/// One stage's claim on the gate.
///
/// Dropping an unconsumed ticket withdraws the stage from the gate.
pub(crate) struct Ticket {
    gate: PauseGate,
    admission: Admission,
    parked: bool,
    settled: bool,
}

impl Ticket {
    /// Gate this ticket was issued by.
    pub(crate) fn gate_id(&self) -> u64 {
        self.gate.id()
    }

    /// Suspend until one authorization has been consumed for this stage.
    pub(crate) async fn authorized(mut self) {
        if self.admission == Admission::Bypassed {
            self.settled = true;
            return;
        }

        self.gate.lock().waiting += 1;
        self.parked = true;

        loop {
            let notified = self.gate.inner.permit_issued.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.gate.lock();
                if state.permits > 0 {
                    state.permits -= 1;
                    state.enlisted -= 1;
                    state.waiting -= 1;
                    state.consumed = state.consumed.saturating_add(1);
                    break;
                }
            }
            notified.await;
        }

        self.parked = false;
        self.settled = true;
        self.gate.inner.permit_consumed.notify_waiters();
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.settled || self.admission == Admission::Bypassed {
            return;
        }
        let mut state = self.gate.lock();
        state.enlisted = state.enlisted.saturating_sub(1);
        if self.parked {
            state.waiting = state.waiting.saturating_sub(1);
        }
        if state.permits > state.enlisted {
            state.permits -= 1;
            state.revoked = state.revoked.saturating_add(1);
        }
        drop(state);
        self.gate.inner.permit_consumed.notify_waiters();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn step_without_stages_overshoots() {
        let gate = PauseGate::new();
        assert_eq!(
            gate.step().err(),
            Some(StepchainError::Overshoot {
                requested: 1,
                available: 0
            })
        );
        assert_eq!(gate.snapshot().issued, 0);
    }

    #[test]
    fn allocate_is_bounded_by_enlisted_stages() {
        let gate = PauseGate::new();
        let _a = gate.enlist();
        let _b = gate.enlist();

        assert!(gate.allocate(3).is_err());
        assert_eq!(gate.snapshot().permits, 0);

        gate.allocate(2).expect("two stages enlisted");
        assert_eq!(gate.remaining(), 0);
        assert!(gate.step().is_err());
    }

    #[test]
    fn allocate_zero_is_a_no_op() {
        let gate = PauseGate::new();
        gate.allocate(0).expect("zero never overshoots");
        assert_eq!(gate.snapshot().issued, 0);
    }

    #[test]
    fn bypass_does_not_enlist() {
        let gate = PauseGate::with_bypass(1);
        let first = gate.enlist();
        assert_eq!(first.admission, Admission::Bypassed);
        assert_eq!(gate.snapshot().enlisted, 0);

        let second = gate.enlist();
        assert_eq!(second.admission, Admission::Gated);
        assert_eq!(gate.snapshot().enlisted, 1);
    }

    #[test]
    fn dropped_ticket_revokes_its_permit() {
        let gate = PauseGate::new();
        let ticket = gate.enlist();
        gate.step().expect("one stage enlisted");
        drop(ticket);

        let snapshot = gate.snapshot();
        assert_eq!(snapshot.enlisted, 0);
        assert_eq!(snapshot.permits, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn ticket_parks_until_step() {
        let gate = PauseGate::new();
        let ticket = gate.enlist();
        let stage = tokio::spawn(ticket.authorized());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!stage.is_finished());
        assert_eq!(gate.snapshot().waiting, 1);

        gate.step().expect("stage enlisted");
        stage.await.expect("join");

        let snapshot = gate.snapshot();
        assert_eq!(snapshot.waiting, 0);
        assert_eq!(snapshot.consumed, 1);
        assert_eq!(snapshot.enlisted, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn advance_waits_for_consumption() {
        let gate = PauseGate::new();
        let ticket = gate.enlist();
        let stage = tokio::spawn(ticket.authorized());

        gate.advance().await;
        assert_eq!(gate.snapshot().consumed, 1);
        stage.await.expect("join");
    }

    #[tokio::test]
    async fn advance_pends_without_stages() {
        let gate = PauseGate::new();
        let waited = tokio::time::timeout(Duration::from_millis(20), gate.advance()).await;
        assert!(waited.is_err());
        assert_eq!(gate.snapshot().issued, 0);
    }
}
