//! # Stage Channel
//!
//! A single-producer/single-consumer, single-use handoff cell.
//!
//! Exactly one packet is ever written and it is read at most once. The cell is
//! an explicit state slot guarded by a mutex, with a `Notify` for async readers
//! and a `Condvar` for blocking readers, so no queue is allocated per stage.
//!
//! Both ends are consumed by value: `send` takes the sender, `recv` and
//! `blocking_recv` take the receiver. A sender dropped without sending leaves
//! the receiver pending forever.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use tokio::sync::Notify;

struct Shared<P> {
    /// `None` while pending, `Some` once the producer has emitted.
    slot: Mutex<Option<P>>,
    ready: Condvar,
    notify: Notify,
}

/// Write end of a stage channel.
pub struct StageSender<P> {
    shared: Arc<Shared<P>>,
}

/// Read end of a stage channel.
pub struct StageReceiver<P> {
    shared: Arc<Shared<P>>,
}

/// Allocate a fresh stage channel.
#[must_use]
pub fn stage_channel<P>() -> (StageSender<P>, StageReceiver<P>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(None),
        ready: Condvar::new(),
        notify: Notify::new(),
    });
    (
        StageSender {
            shared: Arc::clone(&shared),
        },
        StageReceiver { shared },
    )
}

impl<P> StageSender<P> {
    /// Emit the packet. Never blocks.
    pub fn send(self, packet: P) {
        let mut slot = self
            .shared
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(packet);
        drop(slot);

        self.shared.ready.notify_all();
        // Stores a permit if the reader is not parked yet.
        self.shared.notify.notify_one();
    }
}

impl<P> StageReceiver<P> {
    /// Check whether the producer has emitted.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.shared
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn try_take(&self) -> Option<P> {
        self.shared
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Wait for the packet without blocking the thread.
    pub async fn recv(self) -> P {
        loop {
            if let Some(packet) = self.try_take() {
                return packet;
            }
            self.shared.notify.notified().await;
        }
    }

    /// Block the current thread until the packet arrives.
    ///
    /// Must not be called from an async context.
    pub fn blocking_recv(self) -> P {
        let mut slot = self
            .shared
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(packet) = slot.take() {
                return packet;
            }
            slot = self
                .shared
                .ready
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl<P> std::fmt::Debug for StageReceiver<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageReceiver")
            .field("ready", &self.is_ready())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
