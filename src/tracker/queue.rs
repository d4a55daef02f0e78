//! The pending event queue, decoupled from the timer policy so the retry
//! behavior can be tested without a clock.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tracker::traits::{FlushTarget, TrackingStore};

/// One view or share occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub property_id: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
}

/// Everything recorded but not yet confirmed delivered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PendingBatch {
    pub views: Vec<TrackingEvent>,
    pub shares: Vec<TrackingEvent>,
}

impl PendingBatch {
    pub fn is_empty(&self) -> bool {
        self.views.is_empty() && self.shares.is_empty()
    }

    pub fn len(&self) -> usize {
        self.views.len() + self.shares.len()
    }
}

/// Durable queue of view/share events.
///
/// Views are de-duplicated per browsing session (one queue instance is one
/// session); shares are recorded unconditionally. Events leave the queue
/// only on a confirmed successful flush.
pub struct TrackingQueue {
    store: Arc<dyn TrackingStore>,
    viewed_this_session: HashSet<String>,
}

impl TrackingQueue {
    pub fn new(store: Arc<dyn TrackingStore>) -> Self {
        Self {
            store,
            viewed_this_session: HashSet::new(),
        }
    }

    /// Record a view; returns `false` when the id was already viewed this
    /// session and nothing was enqueued.
    pub fn record_view(&mut self, property_id: &str) -> bool {
        if !self.viewed_this_session.insert(property_id.to_string()) {
            return false;
        }

        let mut batch = self.store.load();
        batch.views.push(TrackingEvent {
            property_id: property_id.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        });
        self.store.save(&batch);
        true
    }

    pub fn record_share(&mut self, property_id: &str) {
        let mut batch = self.store.load();
        batch.shares.push(TrackingEvent {
            property_id: property_id.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        });
        self.store.save(&batch);
    }

    /// Peek at the queued events without removing them.
    pub fn pending(&self) -> PendingBatch {
        self.store.load()
    }

    pub fn len(&self) -> usize {
        self.store.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.load().is_empty()
    }

    /// Deliver the full queue contents to `target`. Returns `Ok(false)`
    /// when there was nothing to send. On delivery failure the queue is
    /// left untouched for the next trigger; on success it is cleared.
    pub async fn flush(&mut self, target: &dyn FlushTarget) -> Result<bool> {
        let batch = self.store.load();
        if batch.is_empty() {
            return Ok(false);
        }

        target.deliver(&batch).await?;
        self.store.save(&PendingBatch::default());
        Ok(true)
    }
}
