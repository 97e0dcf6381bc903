//! Per-match mutual exclusion.
//!
//! A single mutex protects a map from match id to a refcounted slot holding a
//! one-permit semaphore. The mutex is only held for refcount bookkeeping;
//! waiting for the permit happens outside it. Tokio's semaphore hands out
//! permits in request order, which gives FIFO queueing per match id. Slots are
//! removed when their refcount drops to zero.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{RiftError, RiftResult};

#[derive(Debug)]
struct Slot {
    refcount: usize,
    semaphore: Arc<Semaphore>,
}

type SlotMap = HashMap<String, Slot>;

#[derive(Debug, Clone, Default)]
pub struct MatchExecutionGuard {
    slots: Arc<Mutex<SlotMap>>,
}

impl MatchExecutionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the exclusive right to run `match_id`.
    ///
    /// Cancelling the returned future before it resolves gives up the place
    /// in the queue without leaking the slot.
    pub async fn acquire(&self, match_id: &str) -> RiftResult<GuardToken> {
        let semaphore = {
            let mut slots = lock(&self.slots);
            let slot = slots.entry(match_id.to_string()).or_insert_with(|| Slot {
                refcount: 0,
                semaphore: Arc::new(Semaphore::new(1)),
            });
            slot.refcount += 1;
            Arc::clone(&slot.semaphore)
        };

        let registration = Registration {
            slots: Arc::clone(&self.slots),
            match_id: match_id.to_string(),
        };

        let permit = semaphore
            .acquire_owned()
            .await
            .map_err(|_| RiftError::Unknown {
                message: format!("guard for {match_id} was closed"),
            })?;

        tracing::trace!(match_id, "guard acquired");
        Ok(GuardToken {
            permit: Some(permit),
            registration: Some(registration),
        })
    }

    /// Number of match ids with a holder or waiter.
    pub fn active_matches(&self) -> usize {
        lock(&self.slots).len()
    }

    /// Holders plus waiters for one match id.
    pub fn refcount(&self, match_id: &str) -> usize {
        lock(&self.slots)
            .get(match_id)
            .map(|s| s.refcount)
            .unwrap_or(0)
    }
}

fn lock(slots: &Mutex<SlotMap>) -> MutexGuard<'_, SlotMap> {
    slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Refcount share owned by one acquirer, waiting or holding.
#[derive(Debug)]
struct Registration {
    slots: Arc<Mutex<SlotMap>>,
    match_id: String,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut slots = lock(&self.slots);
        if let Some(slot) = slots.get_mut(&self.match_id) {
            slot.refcount = slot.refcount.saturating_sub(1);
            if slot.refcount == 0 {
                slots.remove(&self.match_id);
            }
        }
    }
}

/// Exclusive right to run the pipeline for one match id. Released on drop.
#[derive(Debug)]
pub struct GuardToken {
    permit: Option<OwnedSemaphorePermit>,
    registration: Option<Registration>,
}

impl GuardToken {
    pub fn match_id(&self) -> &str {
        self.registration
            .as_ref()
            .map(|r| r.match_id.as_str())
            .unwrap_or_default()
    }

    /// Explicit release; equivalent to dropping the token.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        // Permit first so the next waiter can proceed, then the refcount.
        drop(self.permit.take());
        if let Some(registration) = self.registration.take() {
            tracing::trace!(match_id = %registration.match_id, "guard released");
            drop(registration);
        }
    }
}

impl Drop for GuardToken {
    fn drop(&mut self) {
        self.release_inner();
    }
}
