//! Admission gate for outbound AI requests
//!
//! Caps the number of AI requests in flight at once so that bursts of
//! chat traffic do not overwhelm the upstream provider's rate limits.
//! One gate is constructed at startup and shared by every caller that
//! issues AI requests.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, trace};

use crate::config::Settings;

/// Errors that can occur when constructing a gate
#[derive(Debug, Error)]
pub enum GateError {
    /// Configured capacity cannot admit any request
    #[error("gate capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),
}

/// Bounded admission gate for concurrent asynchronous operations
///
/// At most `capacity` operations run at once; further callers suspend
/// inside [`run`](Self::run) until a slot frees. A slot is released
/// when its operation returns, fails, or is cancelled, so a failing
/// request never permanently reduces capacity.
///
/// Construct one gate during process startup and pass it (typically in
/// an `Arc`) to every caller that issues AI requests.
pub struct RequestGate {
    /// Configured slot count, immutable after construction
    capacity: usize,
    /// Wait queue; a permit is held for the whole guarded operation
    permits: Semaphore,
    /// Operations currently admitted and not yet released
    in_flight: AtomicUsize,
}

impl RequestGate {
    /// Create a gate that admits at most `capacity` concurrent operations
    ///
    /// # Examples
    ///
    /// ```
    /// use pandapal_gate::RequestGate;
    ///
    /// # async fn example() -> Result<(), pandapal_gate::GateError> {
    /// let gate = RequestGate::new(8)?;
    /// let reply = gate.run(async { "tutor reply" }).await;
    /// assert_eq!(reply, "tutor reply");
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `GateError::InvalidCapacity` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, GateError> {
        if capacity == 0 {
            return Err(GateError::InvalidCapacity(capacity));
        }

        Ok(Self {
            capacity,
            permits: Semaphore::new(capacity),
            in_flight: AtomicUsize::new(0),
        })
    }

    /// Create a gate sized from application settings
    ///
    /// # Errors
    ///
    /// Returns `GateError::InvalidCapacity` if `ai_max_concurrency` is
    /// configured as zero.
    pub fn from_settings(settings: &Settings) -> Result<Self, GateError> {
        Self::new(settings.ai_max_concurrency)
    }

    /// Run `operation` once a free slot exists
    ///
    /// Suspends the calling task while the gate is full; operations
    /// that never exceed capacity are never delayed. The operation's
    /// output is returned unchanged: the gate adds no retry, timeout,
    /// or error handling of its own, and the slot is released before
    /// the caller observes the result. Dropping the returned future
    /// while waiting leaves the gate untouched; dropping it while the
    /// operation runs still releases the slot.
    pub async fn run<F>(&self, operation: F) -> F::Output
    where
        F: Future,
    {
        trace!(
            in_flight = self.active_count(),
            capacity = self.capacity,
            "waiting for gate slot"
        );

        // The semaphore is never closed, so acquire cannot fail.
        let _permit = self
            .permits
            .acquire()
            .await
            .expect("gate semaphore is never closed");
        let _slot = SlotGuard::enter(self);

        operation.await
    }

    /// Number of operations currently admitted and not yet released
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Number of free slots remaining
    #[must_use]
    pub fn available_slots(&self) -> usize {
        self.capacity - self.active_count()
    }

    /// The configured slot capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Guard for one admission slot; decrements `in_flight` when dropped,
/// whichever way the guarded operation ends.
struct SlotGuard<'a> {
    gate: &'a RequestGate,
}

impl<'a> SlotGuard<'a> {
    fn enter(gate: &'a RequestGate) -> Self {
        let now_active = gate.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            in_flight = now_active,
            capacity = gate.capacity,
            "AI request admitted"
        );
        Self { gate }
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let now_active = self.gate.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!(in_flight = now_active, "gate slot released");
    }
}
