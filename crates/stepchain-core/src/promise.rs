//! # Promise
//!
//! The eager chain: `resolve`, `reject`, `new`, `then`, `catch`.
//!
//! A `Promise` owns the read end of one stage channel. Attaching a stage
//! allocates a fresh channel and spawns one Tokio task that performs exactly
//! one handoff: read the upstream packet, transform it, emit downstream.
//!
//! ## Routing
//!
//! | Inbound | `then(f)` | `catch(h)` |
//! |---------|-----------|------------|
//! | `Ok(v)` | `Ok(f(v))` | `Ok(v)` (h skipped) |
//! | `Err(e)` | `Err(e)` (f skipped) | `Ok(h(e))` |
//!
//! `then`, `catch` and `new` spawn onto the current Tokio runtime and panic
//! when called outside one. `resolve` and `reject` need no runtime.

use crate::channel::{StageReceiver, StageSender, stage_channel};
use crate::gate::Ticket;
use crate::types::{Packet, StageState};
use std::sync::{Arc, Mutex, PoisonError};

// =============================================================================
// STAGE TASK
// =============================================================================

/// Spawn one stage between `upstream` and a fresh output channel.
///
/// With a ticket, a paused inbound packet parks the stage until the ticket is
/// authorized. The pause flag is carried through to the output unchanged.
pub(crate) fn spawn_stage<T, U, E, F>(
    upstream: StageReceiver<Packet<T, E>>,
    ticket: Option<Ticket>,
    transform: F,
) -> StageReceiver<Packet<U, E>>
where
    T: Send + 'static,
    U: Send + 'static,
    E: Send + 'static,
    F: FnOnce(Result<T, E>) -> Result<U, E> + Send + 'static,
{
    let (tx, rx) = stage_channel();

    tokio::spawn(async move {
        let (outcome, paused) = upstream.recv().await.into_parts();

        let state = StageState::initial(paused);
        // An unpaused packet withdraws the ticket on drop.
        if let (Some(ticket), StageState::AwaitingAuthorization) = (ticket, state) {
            let gate = ticket.gate_id();
            tracing::trace!(gate, %state, "stage parked");
            ticket.authorized().await;
            tracing::trace!(gate, state = %StageState::Running, "stage authorized");
        }

        tx.send(Packet::from_outcome(transform(outcome), paused));
        tracing::trace!(state = %StageState::Emitted, paused, "stage emitted");
    });

    rx
}

// =============================================================================
// PROMISE
// =============================================================================

/// A deferred outcome that settles exactly once.
pub struct Promise<T, E> {
    receiver: StageReceiver<Packet<T, E>>,
}

impl<T, E> Promise<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn from_receiver(receiver: StageReceiver<Packet<T, E>>) -> Self {
        Self { receiver }
    }

    fn emit(packet: Packet<T, E>) -> Self {
        let (tx, rx) = stage_channel();
        tx.send(packet);
        Self::from_receiver(rx)
    }

    /// A promise already holding a success value.
    #[must_use]
    pub fn resolve(value: T) -> Self {
        Self::emit(Packet::value(value))
    }

    /// A promise already holding a failure.
    #[must_use]
    pub fn reject(error: E) -> Self {
        Self::emit(Packet::error(error))
    }

    /// Wrap a task that completes through injected callbacks.
    ///
    /// `init` runs on the blocking pool. The first of `resolve`/`reject` to be
    /// called settles the promise; later calls return `false`. If both are
    /// dropped uncalled, the promise never settles.
    pub fn new<F>(init: F) -> Self
    where
        F: FnOnce(Resolver<T, E>, Rejecter<T, E>) + Send + 'static,
    {
        let (tx, rx) = stage_channel();
        let slot = Arc::new(Mutex::new(Some(tx)));
        let resolver = Resolver {
            slot: Arc::clone(&slot),
        };
        let rejecter = Rejecter { slot };

        tokio::task::spawn_blocking(move || init(resolver, rejecter));
        Self::from_receiver(rx)
    }

    /// Transform the success value. Failures pass through untouched.
    #[must_use]
    pub fn then<U, F>(self, callback: F) -> Promise<U, E>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        Promise::from_receiver(spawn_stage(self.receiver, None, move |outcome| {
            outcome.map(callback)
        }))
    }

    /// Recover from a failure. Success values pass through untouched.
    ///
    /// The result is always a success; there is no way to re-raise.
    #[must_use]
    pub fn catch<F>(self, callback: F) -> Promise<T, E>
    where
        F: FnOnce(E) -> T + Send + 'static,
    {
        Promise::from_receiver(spawn_stage(self.receiver, None, move |outcome| {
            Ok(outcome.unwrap_or_else(callback))
        }))
    }

    /// Check whether the outcome is available without waiting.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.receiver.is_ready()
    }

    /// Wait for the outcome.
    pub async fn settle(self) -> Result<T, E> {
        self.receiver.recv().await.into_outcome()
    }

    /// Block the current thread until the outcome is available.
    ///
    /// Must not be called from an async context.
    pub fn blocking_settle(self) -> Result<T, E> {
        self.receiver.blocking_recv().into_outcome()
    }
}

impl<T, E> std::fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("settled", &self.receiver.is_ready())
            .finish()
    }
}

// =============================================================================
// COMPLETION CALLBACKS
// =============================================================================

type CompletionSlot<T, E> = Arc<Mutex<Option<StageSender<Packet<T, E>>>>>;

fn complete<T, E>(slot: &CompletionSlot<T, E>, packet: Packet<T, E>) -> bool {
    let sender = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    match sender {
        Some(sender) => {
            sender.send(packet);
            true
        }
        None => false,
    }
}

/// Success completion injected into a [`Promise::new`] initializer.
pub struct Resolver<T, E> {
    slot: CompletionSlot<T, E>,
}

impl<T, E> Resolver<T, E> {
    /// Settle with a value. Returns `false` if the promise had already settled.
    pub fn resolve(self, value: T) -> bool {
        complete(&self.slot, Packet::value(value))
    }
}

/// Failure completion injected into a [`Promise::new`] initializer.
pub struct Rejecter<T, E> {
    slot: CompletionSlot<T, E>,
}

impl<T, E> Rejecter<T, E> {
    /// Settle with an error. Returns `false` if the promise had already settled.
    pub fn reject(self, error: E) -> bool {
        complete(&self.slot, Packet::error(error))
    }
}

// =============================================================================
// TESTS
// =============================================================================
