//! Worker budget for request execution.
//!
//! # Responsibilities
//! - Bound the number of requests executing handler logic concurrently
//! - Hand out a slot per request, released when the slot is dropped
//! - Drain: wait until every slot is back, then refuse new ones
//!
//! # Design Decisions
//! - A semaphore with `max_workers` permits is the whole budget
//! - Waiting for a slot has no deadline; client timeouts are the client's
//! - Slots are owned, so they can move into the blocking task that runs the
//!   handler and stay held even if the client disconnects

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::observability::metrics;

/// The pool no longer admits requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("worker pool is closed")]
pub struct PoolClosed;

/// Fixed-size worker budget.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    max_workers: usize,
    next_slot_id: Arc<AtomicU64>,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        metrics::record_slots_available(max_workers);
        Self {
            slots: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            next_slot_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Wait for a free worker.
    pub async fn acquire(&self) -> Result<WorkerSlot, PoolClosed> {
        let started = Instant::now();
        let permit = Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| PoolClosed)?;

        let id = self.next_slot_id.fetch_add(1, Ordering::Relaxed);
        metrics::record_slot_wait(started.elapsed());
        metrics::record_slots_available(self.slots.available_permits());
        tracing::trace!(
            slot = id,
            waited_ms = started.elapsed().as_millis() as u64,
            available = self.slots.available_permits(),
            "Worker slot acquired"
        );

        Ok(WorkerSlot {
            _permit: permit,
            slots: Arc::clone(&self.slots),
            id,
        })
    }

    /// Wait until every slot has been released, then close the pool.
    pub async fn drain(&self) {
        let all = u32::try_from(self.max_workers).unwrap_or(u32::MAX);
        match self.slots.acquire_many(all).await {
            Ok(_permits) => {
                self.slots.close();
                tracing::debug!(max_workers = self.max_workers, "Worker pool drained");
            }
            Err(_) => tracing::debug!("Worker pool already closed"),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Requests currently holding a slot.
    pub fn in_flight(&self) -> usize {
        if self.slots.is_closed() {
            return 0;
        }
        self.max_workers.saturating_sub(self.available())
    }

    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }
}

/// One unit of dispatcher capacity. Released on drop, even on panic.
#[derive(Debug)]
pub struct WorkerSlot {
    _permit: OwnedSemaphorePermit,
    slots: Arc<Semaphore>,
    id: u64,
}

impl WorkerSlot {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        // permit is released right after this body runs
        metrics::record_slots_available(self.slots.available_permits() + 1);
        tracing::trace!(slot = self.id, "Worker slot released");
    }
}
