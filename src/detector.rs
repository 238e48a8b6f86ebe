//! Order-status change detection.
//!
//! [`DetectorState`] holds the last status seen for every order of one session
//! plus the priming flag. Feeding it a batch of [`ChangeRecord`]s returns the
//! notifications that batch warrants. Nothing here touches I/O, so the session
//! task in [`crate::watcher`] is the only place where batches meet the sinks.

use crate::models::ids::OrderId;
use crate::models::{ChangeRecord, NotificationEvent, STATUS_UPDATED_TITLE};
use log::{debug, warn};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorState {
    statuses: HashMap<OrderId, Option<String>>,
    priming: bool,
    title: String,
}

impl Default for DetectorState {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorState {
    pub fn new() -> Self {
        Self::with_title(STATUS_UPDATED_TITLE)
    }

    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            statuses: HashMap::new(),
            priming: true,
            title: title.into(),
        }
    }

    /// True until the first batch has been fully processed.
    pub fn is_priming(&self) -> bool {
        self.priming
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// `None` if the order was never seen, `Some(None)` if it was seen without a status.
    pub fn status_of(&self, order_id: &str) -> Option<Option<&str>> {
        self.statuses.get(order_id).map(|s| s.as_deref())
    }

    pub fn reset(&mut self) {
        self.statuses.clear();
        self.priming = true;
    }

    /// Applies one batch in delivery order and returns the notifications it produced.
    ///
    /// Every non-removed record overwrites the stored status. When an order
    /// appears more than once in the batch, only its last record is considered
    /// for notification, and it is compared against the status stored before
    /// the batch started.
    pub fn apply(&mut self, batch: &[ChangeRecord]) -> Vec<NotificationEvent> {
        let was_priming = self.priming;

        let mut last_seen: HashMap<&OrderId, usize> = HashMap::new();
        for (idx, record) in batch.iter().enumerate() {
            if let Some(order_id) = record.order_id.as_ref() {
                last_seen.insert(order_id, idx);
            }
        }

        let mut before_batch: HashMap<&OrderId, Option<String>> = HashMap::new();
        let mut events = Vec::new();

        for (idx, record) in batch.iter().enumerate() {
            let Some(order_id) = record.order_id.as_ref() else {
                warn!(
                    target: "order_status_watcher",
                    "Skipping {:?} change without an order id",
                    record.kind
                );
                continue;
            };

            let previous = before_batch
                .entry(order_id)
                .or_insert_with(|| self.statuses.get(order_id).cloned().flatten())
                .clone();

            if !record.kind.is_removal() {
                self.statuses.insert(order_id.clone(), record.status.clone());
            }

            if was_priming || last_seen.get(order_id) != Some(&idx) {
                continue;
            }

            if let Some(event) = self.transition(order_id, previous, record) {
                debug!(
                    target: "order_status_watcher",
                    "Order {} moved from {} to {}",
                    event.order_id,
                    event.previous_status,
                    event.new_status
                );
                events.push(event);
            }
        }

        self.priming = false;
        events
    }

    fn transition(
        &self,
        order_id: &OrderId,
        previous: Option<String>,
        record: &ChangeRecord,
    ) -> Option<NotificationEvent> {
        if record.kind.is_removal() {
            return None;
        }
        let previous = previous?;
        let current = record.status.as_ref()?;
        if &previous == current {
            return None;
        }
        Some(NotificationEvent::status_changed(
            order_id.clone(),
            previous,
            current.clone(),
            &self.title,
        ))
    }
}

/// Pure form of [`DetectorState::apply`].
pub fn reconcile(
    mut state: DetectorState,
    batch: &[ChangeRecord],
) -> (DetectorState, Vec<NotificationEvent>) {
    let events = state.apply(batch);
    (state, events)
}
