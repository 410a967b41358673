//! Debounced Sync Scheduler
//!
//! Coalesces rapid edits to one row into a single delayed gateway update:
//! scheduling again before the quiescence window elapses replaces the
//! pending sync, so only the most recent payload per row is ever sent.
//! Rows are independent; updates for different rows may be in flight
//! concurrently, while the replace rule serializes updates for one row.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::LineItemPatch;
use crate::repository::PersistenceGateway;

/// Quiescence window between the last edit to a row and its persistence call
pub const DEFAULT_SYNC_WINDOW: Duration = Duration::from_millis(1000);

/// Per-row saving state surfaced to the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "message")]
pub enum SyncStatus {
    /// Edit registered, window not yet elapsed
    Pending,
    /// Gateway call dispatched
    Saving,
    Saved,
    /// Gateway call failed; local value kept, no automatic retry
    Failed(String),
}

/// Broadcast after each completed gateway call
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Saved { item_id: u32 },
    Failed { item_id: u32, message: String },
}

pub struct SyncScheduler {
    gateway: Arc<dyn PersistenceGateway>,
    window: Duration,
    /// Monotonic ticket counter; generations never repeat, so a timer that
    /// wakes with a stale ticket can never fire, even across a discard.
    next_generation: AtomicU64,
    generations: Arc<Mutex<HashMap<u32, u64>>>,
    statuses: Arc<Mutex<HashMap<u32, SyncStatus>>>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncScheduler {
    pub fn new(gateway: Arc<dyn PersistenceGateway>, window: Duration) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            gateway,
            window,
            next_generation: AtomicU64::new(1),
            generations: Arc::new(Mutex::new(HashMap::new())),
            statuses: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Register an intent to persist `patch` for `item_id` once the row has
    /// been quiet for the full window. A pending sync for the same row is
    /// replaced, not queued; an already-dispatched call is left alone.
    pub fn schedule(&self, item_id: u32, patch: LineItemPatch) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        self.generations
            .lock()
            .expect("generation map poisoned")
            .insert(item_id, generation);
        self.statuses
            .lock()
            .expect("status map poisoned")
            .insert(item_id, SyncStatus::Pending);

        let gateway = self.gateway.clone();
        let window = self.window;
        let generations = self.generations.clone();
        let statuses = self.statuses.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            tokio::time::sleep(window).await;

            // Superseded or discarded while waiting
            {
                let map = generations.lock().expect("generation map poisoned");
                if map.get(&item_id) != Some(&generation) {
                    return;
                }
            }

            statuses
                .lock()
                .expect("status map poisoned")
                .insert(item_id, SyncStatus::Saving);

            match gateway.update_line_item(item_id, &patch).await {
                Ok(()) => {
                    statuses
                        .lock()
                        .expect("status map poisoned")
                        .insert(item_id, SyncStatus::Saved);
                    let _ = events.send(SyncEvent::Saved { item_id });
                }
                Err(e) => {
                    let message = e.to_string();
                    log::error!("Sync failed for line item {}: {}", item_id, message);
                    statuses
                        .lock()
                        .expect("status map poisoned")
                        .insert(item_id, SyncStatus::Failed(message.clone()));
                    let _ = events.send(SyncEvent::Failed { item_id, message });
                }
            }
        });
    }

    /// Invalidate every not-yet-fired timer. Calls already dispatched to the
    /// gateway run to completion.
    pub fn discard_pending(&self) {
        self.generations
            .lock()
            .expect("generation map poisoned")
            .clear();
    }

    /// Discard pending timers and forget all per-row statuses (full reload)
    pub fn reset(&self) {
        self.discard_pending();
        self.statuses.lock().expect("status map poisoned").clear();
    }

    pub fn sync_status(&self, item_id: u32) -> Option<SyncStatus> {
        self.statuses
            .lock()
            .expect("status map poisoned")
            .get(&item_id)
            .cloned()
    }

    pub fn statuses(&self) -> HashMap<u32, SyncStatus> {
        self.statuses.lock().expect("status map poisoned").clone()
    }

    /// Completion notifications, the analog of a UI event channel
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        // Navigating away discards debounce timers, not dispatched calls
        self.discard_pending();
    }
}
